use crate::error::{CoercionError, ModelError};
use crate::grid::DataGrid;
use crate::value::{SettingValue, ValueType};
use serde::Serialize;

/// The closed set of setting shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettingKind {
    /// A single typed value.
    Scalar { value: SettingValue },
    /// A typed value restricted to a list of allowed renderings.
    DropDown {
        value: SettingValue,
        valid_values: Vec<String>,
    },
    /// A table of typed, named columns.
    DataGrid { grid: DataGrid },
}

/// One named, typed configuration value plus its UI and validation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Setting {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: SettingKind,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_explanation: Option<String>,
    pub advanced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,
    /// The only visibility input scripts may change.
    pub enabled_by_parent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_color: Option<String>,
    pub is_read_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_line_count: Option<i64>,
    /// Script evaluated whenever this setting changes.
    #[serde(skip)]
    pub script: Option<String>,
}

impl Setting {
    fn with_kind(name: impl Into<String>, kind: SettingKind) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind,
            is_valid: true,
            validation_explanation: None,
            advanced: false,
            display_order: None,
            enabled_by_parent: true,
            category_name: None,
            category_color: None,
            is_read_only: false,
            editor_line_count: None,
            script: None,
        }
    }

    /// Creates a scalar setting holding `value`.
    pub fn new(name: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        Self::with_kind(
            name,
            SettingKind::Scalar {
                value: value.into(),
            },
        )
    }

    /// Creates a drop-down setting. The initial value is not checked against
    /// `valid_values` so schemas can start from an unset (empty) choice.
    pub fn drop_down(
        name: impl Into<String>,
        value: impl Into<SettingValue>,
        valid_values: Vec<String>,
    ) -> Self {
        Self::with_kind(
            name,
            SettingKind::DropDown {
                value: value.into(),
                valid_values,
            },
        )
    }

    pub fn data_grid(name: impl Into<String>, grid: DataGrid) -> Self {
        Self::with_kind(name, SettingKind::DataGrid { grid })
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    #[must_use]
    pub fn with_display_order(mut self, order: i64) -> Self {
        self.display_order = Some(order);
        self
    }

    #[must_use]
    pub fn with_category(mut self, name: impl Into<String>, color: Option<String>) -> Self {
        self.category_name = Some(name.into());
        self.category_color = color;
        self
    }

    #[must_use]
    pub fn advanced(mut self) -> Self {
        self.advanced = true;
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.is_read_only = true;
        self
    }

    pub fn value_type(&self) -> ValueType {
        match &self.kind {
            SettingKind::Scalar { value } | SettingKind::DropDown { value, .. } => {
                value.value_type()
            }
            SettingKind::DataGrid { .. } => ValueType::DataGrid,
        }
    }

    /// The scalar value, or `None` for a data grid.
    pub fn value(&self) -> Option<&SettingValue> {
        match &self.kind {
            SettingKind::Scalar { value } | SettingKind::DropDown { value, .. } => Some(value),
            SettingKind::DataGrid { .. } => None,
        }
    }

    pub fn grid(&self) -> Option<&DataGrid> {
        match &self.kind {
            SettingKind::DataGrid { grid } => Some(grid),
            _ => None,
        }
    }

    pub fn grid_mut(&mut self) -> Option<&mut DataGrid> {
        match &mut self.kind {
            SettingKind::DataGrid { grid } => Some(grid),
            _ => None,
        }
    }

    pub fn valid_values(&self) -> Option<&[String]> {
        match &self.kind {
            SettingKind::DropDown { valid_values, .. } => Some(valid_values),
            _ => None,
        }
    }

    /// Derived visibility: hidden when advanced settings are not shown, or
    /// when a parent script disabled it.
    pub fn is_hidden(&self, show_advanced: bool) -> bool {
        (self.advanced && !show_advanced) || !self.enabled_by_parent
    }

    /// Replaces the scalar value. The value must match (or losslessly
    /// convert to) the declared type; drop-downs also require one of their
    /// valid values.
    pub fn set_value(&mut self, value: SettingValue) -> Result<(), ModelError> {
        let name = self.name.clone();
        match &mut self.kind {
            SettingKind::Scalar { value: current } => {
                *current = value.conform_to(&name, current.value_type())?;
                Ok(())
            }
            SettingKind::DropDown {
                value: current,
                valid_values,
            } => {
                let value = value.conform_to(&name, current.value_type())?;
                check_valid_value(&name, &value, valid_values)?;
                *current = value;
                Ok(())
            }
            SettingKind::DataGrid { .. } => Err(ModelError::TypeMismatch {
                setting: name,
                expected: ValueType::DataGrid,
                actual: value.value_type(),
            }),
        }
    }
}

/// Drop-down values must render as one of the allowed strings.
pub(crate) fn check_valid_value(
    name: &str,
    value: &SettingValue,
    valid_values: &[String],
) -> Result<(), CoercionError> {
    let rendered = value.to_string();
    if valid_values.is_empty() || valid_values.contains(&rendered) {
        Ok(())
    } else {
        Err(CoercionError::new(
            name,
            value.value_type(),
            format!("\"{rendered}\""),
            format!("expected one of [{}]", valid_values.join(", ")),
        ))
    }
}

/// The read/write surface a setting exposes to script evaluation.
///
/// Scripts never touch a live setting: they mutate a staged copy obtained
/// from [`to_staged`](ScriptableSetting::to_staged), and a successful run
/// writes the script-mutable fields back with
/// [`apply_staged`](ScriptableSetting::apply_staged).
pub trait ScriptableSetting {
    fn name(&self) -> &str;

    fn value_type(&self) -> ValueType;

    fn is_data_grid(&self) -> bool {
        self.value_type() == ValueType::DataGrid
    }

    /// A detached copy for a script to mutate.
    fn to_staged(&self) -> Setting;

    /// Copies the script-mutable fields of `staged` onto this setting.
    /// Name, description, script, declared type and grid columns are never
    /// changed. Returns whether anything changed.
    fn apply_staged(&mut self, staged: &Setting) -> Result<bool, ModelError>;
}

impl ScriptableSetting for Setting {
    fn name(&self) -> &str {
        &self.name
    }

    fn value_type(&self) -> ValueType {
        Setting::value_type(self)
    }

    fn to_staged(&self) -> Setting {
        self.clone()
    }

    fn apply_staged(&mut self, staged: &Setting) -> Result<bool, ModelError> {
        if staged.name != self.name {
            return Err(ModelError::SettingNotFound(staged.name.clone()));
        }
        if staged.value_type() != Setting::value_type(self)
            || std::mem::discriminant(&staged.kind) != std::mem::discriminant(&self.kind)
        {
            return Err(ModelError::TypeMismatch {
                setting: self.name.clone(),
                expected: Setting::value_type(self),
                actual: staged.value_type(),
            });
        }
        if let (Some(live), Some(next)) = (self.grid(), staged.grid()) {
            if live.columns() != next.columns() {
                return Err(ModelError::ShapeMismatch(format!(
                    "columns of '{}' cannot change",
                    self.name
                )));
            }
        }

        let before = self.clone();
        match (&mut self.kind, &staged.kind) {
            (SettingKind::Scalar { value }, SettingKind::Scalar { value: next }) => {
                *value = next.clone();
            }
            (
                SettingKind::DropDown {
                    value,
                    valid_values,
                },
                SettingKind::DropDown {
                    value: next,
                    valid_values: next_valid,
                },
            ) => {
                *value = next.clone();
                *valid_values = next_valid.clone();
            }
            (SettingKind::DataGrid { grid }, SettingKind::DataGrid { grid: next }) => {
                grid.replace_rows(next.rows().to_vec())?;
            }
            // variants checked above
            _ => {}
        }
        self.is_valid = staged.is_valid;
        self.validation_explanation = staged.validation_explanation.clone();
        self.advanced = staged.advanced;
        self.display_order = staged.display_order;
        self.enabled_by_parent = staged.enabled_by_parent;
        self.category_name = staged.category_name.clone();
        self.category_color = staged.category_color.clone();
        self.is_read_only = staged.is_read_only;
        self.editor_line_count = staged.editor_line_count;
        Ok(*self != before)
    }
}
