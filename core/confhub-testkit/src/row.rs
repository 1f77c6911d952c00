use confhub_model::SettingValue;

/// A literal grid cell value.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCell(pub SettingValue);

impl TestCell {
    pub fn new(value: impl Into<SettingValue>) -> Self {
        TestCell(value.into())
    }

    pub fn value(&self) -> &SettingValue {
        &self.0
    }
}

impl From<SettingValue> for TestCell {
    fn from(value: SettingValue) -> Self {
        TestCell(value)
    }
}

/// One grid row as `column → literal cell`, in insertion order.
///
/// ```
/// use confhub_testkit::TestRow;
///
/// let row = TestRow::new().cell("Name", "billing").cell("Port", 8080);
/// assert_eq!(row.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestRow {
    cells: Vec<(String, TestCell)>,
}

impl TestRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `column`; a repeated column replaces the earlier cell.
    pub fn cell(self, column: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.with_cell(column, TestCell::new(value))
    }

    pub fn with_cell(mut self, column: impl Into<String>, value: TestCell) -> Self {
        let column = column.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, cell)) => *cell = value,
            None => self.cells.push((column, value)),
        }
        self
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.cells.iter().map(|(name, cell)| (name.as_str(), &cell.0))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for TestRow
where
    K: Into<String>,
    V: Into<SettingValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(TestRow::new(), |row, (column, value)| row.cell(column, value))
    }
}
