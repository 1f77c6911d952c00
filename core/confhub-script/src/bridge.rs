//! Script-facing adapter for one setting.
//!
//! A [`SettingBridge`] is injected into the interpreter as a variable named
//! after its setting, so scripts read and write `Port.Value`,
//! `BaseUrl.IsValid`, `Services.ValidationErrors` and so on.
//!
//! Bridges never write through to the live setting. Every property works on
//! a staged copy; data-grid per-row forms (`Value`, `ValidValues`,
//! `IsReadOnly`, `ValidationErrors`, `EditorLineCount`) are cached as script
//! arrays for the whole run and folded into the staged copy by
//! [`SettingBridge::prepare`] once the script has finished successfully.
//!
//! Cached rows are shared maps, so a script may copy an array into a local
//! and edit it in place (`let rows = Services.Value; rows[0].Name = "x";`).
//! Replacing a whole element of such a local (`rows[0] = #{..}`) and writing
//! to the loop variable of `for row in Services.Value` only touch a copy.

use crate::convert::{
    describe, from_dynamic, optional_dynamic_int, optional_dynamic_string, optional_int,
    optional_string, required_bool, string_array, throw, to_dynamic,
};
use confhub_model::{
    CellError, CoercionError, DataGrid, DataGridCell, ScriptableSetting, Setting, SettingKind,
    ValueType,
};
use rhai::{Array, Dynamic, Engine, EvalAltResult, Map};
use std::cell::RefCell;
use std::rc::Rc;

type PropertyResult<T> = Result<T, Box<EvalAltResult>>;

struct BridgeState {
    staged: Setting,
    rows: Option<Array>,
    valid_values: Option<Array>,
    read_only: Option<Array>,
    validation_errors: Option<Array>,
    /// Error messages as last read or assigned, to detect in-place edits.
    validation_errors_seen: Option<ErrorTable>,
    validation_errors_assigned: bool,
    editor_line_counts: Option<Array>,
}

/// Adapts one setting to the interpreter's dynamic object model.
///
/// Clones share state, so the copy held by the interpreter's scope and the
/// copy kept by the sandbox observe the same mutations.
#[derive(Clone)]
pub struct SettingBridge {
    state: Rc<RefCell<BridgeState>>,
}

impl SettingBridge {
    pub fn new<S: ScriptableSetting + ?Sized>(setting: &S) -> Self {
        Self {
            state: Rc::new(RefCell::new(BridgeState {
                staged: setting.to_staged(),
                rows: None,
                valid_values: None,
                read_only: None,
                validation_errors: None,
                validation_errors_seen: None,
                validation_errors_assigned: false,
                editor_line_counts: None,
            })),
        }
    }

    pub fn name(&self) -> String {
        self.state.borrow().staged.name.clone()
    }

    pub fn is_data_grid(&self) -> bool {
        self.state.borrow().staged.is_data_grid()
    }

    /// Folds every cached per-row form into a copy of the staged setting.
    ///
    /// Runs unconditionally for grids: every cache is parsed again against
    /// the column types and re-applied. With no cache materialized the
    /// result equals the staged setting.
    pub fn prepare(&self) -> Result<Setting, CoercionError> {
        prepare_state(&self.state.borrow())
    }

    /// Registers the `Setting` type and all of its properties. Getters and
    /// setters are registered separately because setters accept any script
    /// value and coerce it themselves.
    pub(crate) fn register(engine: &mut Engine) {
        engine.register_type_with_name::<SettingBridge>("Setting");
        engine.register_get("Name", SettingBridge::get_name);
        engine.register_get("Type", SettingBridge::get_type);
        engine.register_get("Value", SettingBridge::get_value);
        engine.register_set("Value", SettingBridge::set_value);
        engine.register_get("IsValid", SettingBridge::get_is_valid);
        engine.register_set("IsValid", SettingBridge::set_is_valid);
        engine.register_get("ValidationExplanation", SettingBridge::get_validation_explanation);
        engine.register_set("ValidationExplanation", SettingBridge::set_validation_explanation);
        engine.register_get("Advanced", SettingBridge::get_advanced);
        engine.register_set("Advanced", SettingBridge::set_advanced);
        engine.register_get("DisplayOrder", SettingBridge::get_display_order);
        engine.register_set("DisplayOrder", SettingBridge::set_display_order);
        engine.register_get("CategoryName", SettingBridge::get_category_name);
        engine.register_set("CategoryName", SettingBridge::set_category_name);
        engine.register_get("CategoryColor", SettingBridge::get_category_color);
        engine.register_set("CategoryColor", SettingBridge::set_category_color);
        engine.register_get("EditorLineCount", SettingBridge::get_editor_line_count);
        engine.register_set("EditorLineCount", SettingBridge::set_editor_line_count);
        engine.register_get("IsReadOnly", SettingBridge::get_is_read_only);
        engine.register_set("IsReadOnly", SettingBridge::set_is_read_only);
        engine.register_get("IsVisible", SettingBridge::get_is_visible);
        engine.register_set("IsVisible", SettingBridge::set_is_visible);
        engine.register_get("ValidValues", SettingBridge::get_valid_values);
        engine.register_set("ValidValues", SettingBridge::set_valid_values);
        engine.register_get("ValidationErrors", SettingBridge::get_validation_errors);
        engine.register_set("ValidationErrors", SettingBridge::set_validation_errors);
        engine.register_fn("to_string", |bridge: &mut SettingBridge| bridge.name());
    }

    // ================================================================
    // Script-facing properties
    // ================================================================

    fn get_name(&mut self) -> String {
        self.name()
    }

    fn get_type(&mut self) -> String {
        self.state.borrow().staged.value_type().to_string()
    }

    fn get_value(&mut self) -> PropertyResult<Dynamic> {
        let state = &mut *self.state.borrow_mut();
        match &state.staged.kind {
            SettingKind::Scalar { value } | SettingKind::DropDown { value, .. } => {
                Ok(to_dynamic(value))
            }
            SettingKind::DataGrid { grid } => {
                let rows = state.rows.get_or_insert_with(|| rows_of(grid));
                Ok(Dynamic::from_array(rows.clone()))
            }
        }
    }

    fn set_value(&mut self, value: Dynamic) -> PropertyResult<()> {
        let state = &mut *self.state.borrow_mut();
        if state.staged.is_data_grid() {
            return stage_rows(state, &value).map_err(throw);
        }
        let name = state.staged.name.clone();
        let expected = state.staged.value_type();
        let parsed = from_dynamic(&name, &value, expected).map_err(throw)?;
        state
            .staged
            .set_value(parsed)
            .map_err(|e| throw(CoercionError::new(&name, expected, describe(&value), e.to_string())))
    }

    fn get_is_valid(&mut self) -> bool {
        self.state.borrow().staged.is_valid
    }

    fn set_is_valid(&mut self, value: Dynamic) -> PropertyResult<()> {
        let state = &mut *self.state.borrow_mut();
        state.staged.is_valid = required_bool(&target(state, "IsValid"), &value).map_err(throw)?;
        Ok(())
    }

    fn get_validation_explanation(&mut self) -> Dynamic {
        optional_dynamic_string(self.state.borrow().staged.validation_explanation.as_ref())
    }

    fn set_validation_explanation(&mut self, value: Dynamic) -> PropertyResult<()> {
        let state = &mut *self.state.borrow_mut();
        state.staged.validation_explanation =
            optional_string(&target(state, "ValidationExplanation"), &value).map_err(throw)?;
        Ok(())
    }

    fn get_advanced(&mut self) -> bool {
        self.state.borrow().staged.advanced
    }

    fn set_advanced(&mut self, value: Dynamic) -> PropertyResult<()> {
        let state = &mut *self.state.borrow_mut();
        state.staged.advanced = required_bool(&target(state, "Advanced"), &value).map_err(throw)?;
        Ok(())
    }

    fn get_display_order(&mut self) -> Dynamic {
        optional_dynamic_int(self.state.borrow().staged.display_order)
    }

    fn set_display_order(&mut self, value: Dynamic) -> PropertyResult<()> {
        let state = &mut *self.state.borrow_mut();
        state.staged.display_order =
            optional_int(&target(state, "DisplayOrder"), &value).map_err(throw)?;
        Ok(())
    }

    fn get_category_name(&mut self) -> Dynamic {
        optional_dynamic_string(self.state.borrow().staged.category_name.as_ref())
    }

    fn set_category_name(&mut self, value: Dynamic) -> PropertyResult<()> {
        let state = &mut *self.state.borrow_mut();
        state.staged.category_name =
            optional_string(&target(state, "CategoryName"), &value).map_err(throw)?;
        Ok(())
    }

    fn get_category_color(&mut self) -> Dynamic {
        optional_dynamic_string(self.state.borrow().staged.category_color.as_ref())
    }

    fn set_category_color(&mut self, value: Dynamic) -> PropertyResult<()> {
        let state = &mut *self.state.borrow_mut();
        state.staged.category_color =
            optional_string(&target(state, "CategoryColor"), &value).map_err(throw)?;
        Ok(())
    }

    fn get_editor_line_count(&mut self) -> Dynamic {
        let state = &mut *self.state.borrow_mut();
        match &state.staged.kind {
            SettingKind::DataGrid { grid } => {
                let cache = state.editor_line_counts.get_or_insert_with(|| {
                    per_cell(grid, |cell| optional_dynamic_int(cell.editor_line_count))
                });
                Dynamic::from_array(cache.clone())
            }
            _ => optional_dynamic_int(state.staged.editor_line_count),
        }
    }

    fn set_editor_line_count(&mut self, value: Dynamic) -> PropertyResult<()> {
        let state = &mut *self.state.borrow_mut();
        if state.staged.is_data_grid() && value.is_array() {
            return stage_cache(state, Cache::EditorLineCount, &value).map_err(throw);
        }
        state.staged.editor_line_count =
            optional_int(&target(state, "EditorLineCount"), &value).map_err(throw)?;
        Ok(())
    }

    fn get_is_read_only(&mut self) -> Dynamic {
        let state = &mut *self.state.borrow_mut();
        match &state.staged.kind {
            SettingKind::DataGrid { grid } => {
                let cache = state
                    .read_only
                    .get_or_insert_with(|| per_cell(grid, |cell| Dynamic::from(cell.is_read_only)));
                Dynamic::from_array(cache.clone())
            }
            _ => Dynamic::from(state.staged.is_read_only),
        }
    }

    fn set_is_read_only(&mut self, value: Dynamic) -> PropertyResult<()> {
        let state = &mut *self.state.borrow_mut();
        if state.staged.is_data_grid() && value.is_array() {
            return stage_cache(state, Cache::ReadOnly, &value).map_err(throw);
        }
        state.staged.is_read_only =
            required_bool(&target(state, "IsReadOnly"), &value).map_err(throw)?;
        Ok(())
    }

    fn get_is_visible(&mut self) -> bool {
        self.state.borrow().staged.enabled_by_parent
    }

    fn set_is_visible(&mut self, value: Dynamic) -> PropertyResult<()> {
        let state = &mut *self.state.borrow_mut();
        state.staged.enabled_by_parent =
            required_bool(&target(state, "IsVisible"), &value).map_err(throw)?;
        Ok(())
    }

    fn get_valid_values(&mut self) -> Dynamic {
        let state = &mut *self.state.borrow_mut();
        match &state.staged.kind {
            SettingKind::DataGrid { grid } => {
                let cache = state.valid_values.get_or_insert_with(|| {
                    per_cell(grid, |cell| {
                        cell.valid_values
                            .as_deref()
                            .map_or(Dynamic::UNIT, string_array)
                    })
                });
                Dynamic::from_array(cache.clone())
            }
            SettingKind::DropDown { valid_values, .. } => string_array(valid_values),
            SettingKind::Scalar { .. } => Dynamic::UNIT,
        }
    }

    fn set_valid_values(&mut self, value: Dynamic) -> PropertyResult<()> {
        let state = &mut *self.state.borrow_mut();
        if state.staged.is_data_grid() {
            return stage_cache(state, Cache::ValidValues, &value).map_err(throw);
        }
        let label = target(state, "ValidValues");
        let expected = state.staged.value_type();
        match &mut state.staged.kind {
            SettingKind::DropDown { valid_values, .. } => {
                *valid_values = string_list(&label, &value).map_err(throw)?;
                Ok(())
            }
            _ => Err(throw(CoercionError::new(
                label,
                expected,
                describe(&value),
                "only drop-down and data grid settings have valid values",
            ))),
        }
    }

    fn get_validation_errors(&mut self) -> PropertyResult<Dynamic> {
        let state = &mut *self.state.borrow_mut();
        if !state.staged.is_data_grid() {
            return Ok(Dynamic::UNIT);
        }
        // Unedited validator output is computed again on every read.
        if let Some(cache) = &state.validation_errors {
            if state.validation_errors_assigned || errors_edited(state) {
                return Ok(Dynamic::from_array(cache.clone()));
            }
        }
        let prepared = prepare_state(state).map_err(throw)?;
        let Some(grid) = prepared.grid() else {
            return Ok(Dynamic::UNIT);
        };
        let mut rows: Vec<Map> = vec![Map::new(); grid.row_count()];
        for error in grid.validate() {
            if let Some(row) = rows.get_mut(error.row) {
                row.insert(error.column.as_str().into(), Dynamic::from(error.message));
            }
        }
        let cache: Array = rows
            .into_iter()
            .map(|row| Dynamic::from_map(row).into_shared())
            .collect();
        state.validation_errors_seen = Some(error_table(&cache));
        state.validation_errors = Some(cache.clone());
        Ok(Dynamic::from_array(cache))
    }

    /// Assigning per-row errors also sets the grid's own `IsValid` and a
    /// summary `ValidationExplanation` built from the first failing cell.
    fn set_validation_errors(&mut self, value: Dynamic) -> PropertyResult<()> {
        let state = &mut *self.state.borrow_mut();
        if !state.staged.is_data_grid() {
            return Err(throw(CoercionError::new(
                target(state, "ValidationErrors"),
                state.staged.value_type(),
                describe(&value),
                "only data grid settings have per-row validation errors",
            )));
        }
        let value = if value.is_unit() {
            Dynamic::from_array(Array::new())
        } else {
            value
        };
        let was_assigned = std::mem::replace(&mut state.validation_errors_assigned, true);
        if let Err(err) = stage_cache(state, Cache::ValidationErrors, &value) {
            state.validation_errors_assigned = was_assigned;
            return Err(throw(err));
        }
        state.validation_errors_seen = state.validation_errors.as_ref().map(error_table);

        let prepared = prepare_state(state).map_err(throw)?;
        summarize_cell_errors(&mut state.staged, &prepared);
        Ok(())
    }
}

// ================================================================
// Grid caches
// ================================================================

#[derive(Debug, Clone, Copy)]
enum Cache {
    ValidValues,
    ReadOnly,
    ValidationErrors,
    EditorLineCount,
}

impl Cache {
    fn slot(self, state: &mut BridgeState) -> &mut Option<Array> {
        match self {
            Cache::ValidValues => &mut state.valid_values,
            Cache::ReadOnly => &mut state.read_only,
            Cache::ValidationErrors => &mut state.validation_errors,
            Cache::EditorLineCount => &mut state.editor_line_counts,
        }
    }
}

/// Rendered cell messages per row.
type ErrorTable = Vec<Vec<(String, String)>>;

fn error_table(rows: &Array) -> ErrorTable {
    rows.iter()
        .map(|row| match row.clone().try_cast::<Map>() {
            Some(map) => map
                .into_iter()
                .map(|(column, message)| (column.to_string(), message.to_string()))
                .collect(),
            None => vec![(String::new(), describe(row))],
        })
        .collect()
}

/// Whether the script changed a cached error array in place since it was
/// last read or assigned.
fn errors_edited(state: &BridgeState) -> bool {
    match (&state.validation_errors, &state.validation_errors_seen) {
        (Some(cache), Some(seen)) => error_table(cache) != *seen,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Sets `IsValid` and a summary `ValidationExplanation` on `setting` from the
/// explicit cell errors carried by `prepared`.
fn summarize_cell_errors(setting: &mut Setting, prepared: &Setting) {
    let errors: Vec<CellError> = prepared
        .grid()
        .map(|grid| {
            grid.validate()
                .into_iter()
                .filter(|e| {
                    grid.cell(e.row, &e.column)
                        .is_some_and(|c| c.validation_error.is_some())
                })
                .collect()
        })
        .unwrap_or_default();
    setting.is_valid = errors.is_empty();
    setting.validation_explanation = DataGrid::explain(&errors);
}

fn share_rows(rows: Array) -> Array {
    rows.into_iter().map(Dynamic::into_shared).collect()
}

fn target(state: &BridgeState, property: &str) -> String {
    format!("{}.{property}", state.staged.name)
}

fn cell_target(setting: &str, row: usize, column: &str) -> String {
    format!("{setting}[{row}].{column}")
}

fn rows_of(grid: &DataGrid) -> Array {
    per_cell(grid, |cell| to_dynamic(cell.value()))
}

/// One map per row, keyed by column name.
fn per_cell(grid: &DataGrid, mut f: impl FnMut(&DataGridCell) -> Dynamic) -> Array {
    grid.rows()
        .iter()
        .map(|row| {
            let map: Map = grid
                .columns()
                .iter()
                .zip(row.cells())
                .map(|(column, cell)| (column.name.as_str().into(), f(cell)))
                .collect();
            Dynamic::from_map(map).into_shared()
        })
        .collect()
}

fn row_map(setting: &str, index: usize, row: &Dynamic) -> Result<Map, CoercionError> {
    row.clone().try_cast::<Map>().ok_or_else(|| {
        CoercionError::new(
            format!("{setting}[{index}]"),
            ValueType::DataGrid,
            describe(row),
            "rows must be object maps",
        )
    })
}

fn row_array(setting: &str, value: &Dynamic) -> Result<Array, CoercionError> {
    value.clone().into_array().map_err(|_| {
        CoercionError::new(
            setting,
            ValueType::DataGrid,
            describe(value),
            "expected an array with one object per row",
        )
    })
}

fn string_list(target: &str, value: &Dynamic) -> Result<Vec<String>, CoercionError> {
    match from_dynamic(target, value, ValueType::StringList)? {
        confhub_model::SettingValue::StringList(items) => Ok(items),
        _ => Ok(Vec::new()),
    }
}

/// Parses an assigned row array against the column types and caches the
/// normalized rows. Columns missing from an assigned row keep their current
/// value; keys that are not columns are dropped.
fn stage_rows(state: &mut BridgeState, value: &Dynamic) -> Result<(), CoercionError> {
    let name = state.staged.name.clone();
    let Some(grid) = state.staged.grid() else {
        return Ok(());
    };
    let items = row_array(&name, value)?;
    let current = state.rows.get_or_insert_with(|| rows_of(grid)).clone();
    let blank = rows_of_blank(grid);

    let mut next = Array::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let assigned = row_map(&name, index, item)?;
        let mut row = current
            .get(index)
            .and_then(|r| r.clone().try_cast::<Map>())
            .unwrap_or_else(|| blank.clone());
        for column in grid.columns() {
            if let Some(cell) = assigned.get(column.name.as_str()) {
                let parsed = from_dynamic(
                    &cell_target(&name, index, &column.name),
                    cell,
                    column.value_type,
                )?;
                row.insert(column.name.as_str().into(), to_dynamic(&parsed));
            }
        }
        next.push(Dynamic::from_map(row).into_shared());
    }
    state.rows = Some(next);
    Ok(())
}

fn rows_of_blank(grid: &DataGrid) -> Map {
    grid.columns()
        .iter()
        .zip(grid.blank_row().cells())
        .map(|(column, cell)| (column.name.as_str().into(), to_dynamic(cell.value())))
        .collect()
}

/// Caches a per-row metadata array, rejecting it (and keeping the previous
/// cache) when any cell entry has the wrong type.
fn stage_cache(state: &mut BridgeState, cache: Cache, value: &Dynamic) -> Result<(), CoercionError> {
    let name = state.staged.name.clone();
    let rows = share_rows(row_array(&name, value)?);
    for (index, row) in rows.iter().enumerate() {
        row_map(&name, index, row)?;
    }
    let previous = cache.slot(state).replace(rows);
    if let Err(err) = prepare_state(state) {
        *cache.slot(state) = previous;
        return Err(err);
    }
    Ok(())
}

fn prepare_state(state: &BridgeState) -> Result<Setting, CoercionError> {
    let edited_errors = errors_edited(state);
    let mut staged = state.staged.clone();
    let name = staged.name.clone();
    let Some(grid) = staged.grid_mut() else {
        return Ok(staged);
    };

    if let Some(rows) = &state.rows {
        let mut next = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let map = row_map(&name, index, row)?;
            let mut target_row = grid
                .rows()
                .get(index)
                .cloned()
                .unwrap_or_else(|| grid.blank_row());
            for (col, column) in grid.columns().iter().enumerate() {
                let Some(value) = map.get(column.name.as_str()) else {
                    continue;
                };
                let cell_name = cell_target(&name, index, &column.name);
                let parsed = from_dynamic(&cell_name, value, column.value_type)?;
                if let Some(cell) = target_row.cell_mut(col) {
                    cell.set_value(parsed)
                        .map_err(|e| e.with_target(cell_name.clone()))?;
                }
            }
            next.push(target_row);
        }
        grid.replace_rows(next).map_err(|e| {
            CoercionError::new(&name, ValueType::DataGrid, "rows", e.to_string())
        })?;
    }

    apply_per_cell(grid, &name, state.valid_values.as_ref(), |cell, value, target| {
        if let Some(value) = value {
            cell.valid_values = if value.is_unit() {
                None
            } else {
                Some(string_list(target, value)?)
            };
        }
        Ok(())
    })?;
    apply_per_cell(grid, &name, state.read_only.as_ref(), |cell, value, target| {
        if let Some(value) = value {
            cell.is_read_only = required_bool(target, value)?;
        }
        Ok(())
    })?;
    apply_per_cell(grid, &name, state.editor_line_counts.as_ref(), |cell, value, target| {
        if let Some(value) = value {
            cell.editor_line_count = optional_int(target, value)?;
        }
        Ok(())
    })?;
    // A cache that was only read holds derived validator output and is
    // applied only once the script has edited it.
    if !state.validation_errors_assigned && !edited_errors {
        return Ok(staged);
    }
    clear_validation_errors(grid);
    apply_per_cell(grid, &name, state.validation_errors.as_ref(), |cell, value, target| {
        cell.validation_error = match value {
            Some(value) => optional_string(target, value)?.filter(|m| !m.is_empty()),
            None => None,
        };
        Ok(())
    })?;
    if edited_errors {
        let prepared = staged.clone();
        summarize_cell_errors(&mut staged, &prepared);
    }
    Ok(staged)
}

/// An assigned error array replaces every cell error, including rows it
/// does not mention.
fn clear_validation_errors(grid: &mut DataGrid) {
    let columns: Vec<String> = grid.columns().iter().map(|c| c.name.clone()).collect();
    for row in 0..grid.row_count() {
        for column in &columns {
            if let Some(cell) = grid.cell_mut(row, column) {
                cell.validation_error = None;
            }
        }
    }
}

/// Applies one cached per-row array onto the grid cells. Rows beyond the
/// grid's row count are ignored.
fn apply_per_cell<F>(
    grid: &mut DataGrid,
    setting: &str,
    cache: Option<&Array>,
    mut apply: F,
) -> Result<(), CoercionError>
where
    F: FnMut(&mut DataGridCell, Option<&Dynamic>, &str) -> Result<(), CoercionError>,
{
    let Some(rows) = cache else {
        return Ok(());
    };
    let columns: Vec<String> = grid.columns().iter().map(|c| c.name.clone()).collect();
    let row_count = grid.row_count();
    for (index, row) in rows.iter().enumerate().take(row_count) {
        let map = row_map(setting, index, row)?;
        for column in &columns {
            let cell_name = cell_target(setting, index, column);
            if let Some(cell) = grid.cell_mut(index, column) {
                apply(cell, map.get(column.as_str()), &cell_name)?;
            }
        }
    }
    Ok(())
}
