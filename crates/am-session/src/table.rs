//! Client-side table state: search, sorting, paging, and row selection.
//!
//! [`TableState`] never owns rows. Every query takes the current rows and
//! answers with indices into them, so the same state can be applied to
//! fresh data after a refetch.

use std::borrow::Cow;
use std::cmp::Ordering;

use am_core::{Asset, PageInfo, SortOrder};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;

/// A sortable cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    /// Text, compared case-insensitively.
    Text(Cow<'a, str>),
    /// Numeric value.
    Number(f64),
    /// Point in time.
    Time(DateTime<Utc>),
}

impl Cell<'_> {
    const fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Time(_) => 1,
            Self::Text(_) => 2,
        }
    }

    /// Orders two cells; cells of different kinds order by kind.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => collate(a, b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl<'a> From<&'a str> for Cell<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(Cow::Borrowed(value))
    }
}

impl From<f64> for Cell<'_> {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Cell<'_> {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<DateTime<Utc>> for Cell<'_> {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Time(value)
    }
}

/// Lowercases and treats `ё` as `е`, the way Russian dictionaries sort.
fn fold(c: char) -> impl Iterator<Item = char> {
    c.to_lowercase().map(|c| if c == 'ё' { 'е' } else { c })
}

fn collate(a: &str, b: &str) -> Ordering {
    a.chars().flat_map(fold).cmp(b.chars().flat_map(fold))
}

/// Returns `true` if `haystack` contains `needle`, ignoring case.
///
/// `needle` must already be folded with [`fold_query`].
#[must_use]
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.chars().flat_map(fold).collect::<String>().contains(needle)
}

/// Folds a search term for [`contains_folded`].
#[must_use]
pub fn fold_query(term: &str) -> String {
    term.trim().chars().flat_map(fold).collect()
}

/// A row that a [`TableState`] can search and sort.
pub trait TableRow {
    /// Returns the value of column `key`, or `None` when empty or unknown.
    fn cell(&self, key: &str) -> Option<Cell<'_>>;

    /// Returns `true` if the row matches a folded search term.
    fn matches(&self, needle: &str) -> bool;
}

impl TableRow for Asset {
    fn cell(&self, key: &str) -> Option<Cell<'_>> {
        match key {
            "id" => Some(self.id.into()),
            "inventory_number" => Some(self.inventory_number.as_str().into()),
            "name" => Some(self.name.as_str().into()),
            "category" => Some(self.category.label().into()),
            "status" => Some(self.status.label().into()),
            "cost" => Some(self.cost.into()),
            "quantity" => Some(self.quantity.into()),
            "total_value" => Some(self.total_value().into()),
            "warehouse_id" => Some(self.warehouse_id.into()),
            "supplier" => self.supplier.as_deref().map(Cell::from),
            "serial_number" => self.serial_number.as_deref().map(Cell::from),
            "purchase_date" => self.purchase_date.map(Cell::from),
            "warranty_until" => self.warranty_until.map(Cell::from),
            "created_at" => self.created_at.map(Cell::from),
            _ => None,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        contains_folded(&self.name, needle)
            || contains_folded(&self.inventory_number, needle)
            || self.serial_number.as_deref().is_some_and(|s| contains_folded(s, needle))
            || self.supplier.as_deref().is_some_and(|s| contains_folded(s, needle))
    }
}

/// Active sort column and direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Column key.
    pub key: String,
    /// Direction.
    pub order: SortOrder,
}

/// How much of the visible rows is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// No visible row.
    None,
    /// Some but not all visible rows (the "indeterminate" checkbox).
    Partial,
    /// Every visible row, and there is at least one.
    All,
}

/// Search, sort, page, and selection state of a table.
#[derive(Debug, Clone)]
pub struct TableState {
    search: String,
    needle: String,
    sort: Option<SortKey>,
    page: u32,
    size: u32,
    selected: FxHashSet<usize>,
}

impl Default for TableState {
    fn default() -> Self {
        Self::new(10)
    }
}

impl TableState {
    /// Creates a state showing `size` rows per page.
    #[must_use]
    pub fn new(size: u32) -> Self {
        Self {
            search: String::new(),
            needle: String::new(),
            sort: None,
            page: 1,
            size: size.max(1),
            selected: FxHashSet::default(),
        }
    }

    /// Returns the search term as typed.
    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Sets the search term, returning to page 1 and clearing the selection.
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
        self.needle = fold_query(&self.search);
        self.page = 1;
        self.selected.clear();
    }

    /// Returns the active sort.
    #[must_use]
    pub const fn sort(&self) -> Option<&SortKey> {
        self.sort.as_ref()
    }

    /// Sorts by `key`: ascending on first click, descending on the second,
    /// ascending again on the third.
    pub fn toggle_sort(&mut self, key: &str) {
        let order = match &self.sort {
            Some(current) if current.key == key && current.order == SortOrder::Asc => SortOrder::Desc,
            _ => SortOrder::Asc,
        };
        self.sort = Some(SortKey { key: key.to_owned(), order });
    }

    /// Returns to the server order.
    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    /// Returns the one-based page.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Returns the page size.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Moves to `page`, at least 1.
    pub fn go_to_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Changes the page size and returns to page 1.
    pub fn set_page_size(&mut self, size: u32) {
        self.size = size.max(1);
        self.page = 1;
    }

    /// Returns the indices of matching rows in display order.
    ///
    /// Empty values sort last in both directions.
    pub fn view<R: TableRow>(&self, rows: &[R]) -> Vec<usize> {
        let mut indices: Vec<usize> =
            (0..rows.len()).filter(|&i| self.needle.is_empty() || rows[i].matches(&self.needle)).collect();

        if let Some(sort) = &self.sort {
            indices.sort_by(|&a, &b| {
                match (rows[a].cell(&sort.key), rows[b].cell(&sort.key)) {
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(_), None) => Ordering::Less,
                    (Some(x), Some(y)) => match sort.order {
                        SortOrder::Asc => x.compare(&y),
                        SortOrder::Desc => y.compare(&x),
                    },
                }
            });
        }
        indices
    }

    /// Returns the indices shown on the current page.
    pub fn page_rows<R: TableRow>(&self, rows: &[R]) -> Vec<usize> {
        let view = self.view(rows);
        let start = (self.page as usize - 1).saturating_mul(self.size as usize);
        view.into_iter().skip(start).take(self.size as usize).collect()
    }

    /// Returns page metadata over the matching rows.
    pub fn page_info<R: TableRow>(&self, rows: &[R]) -> PageInfo {
        PageInfo::compute(self.page, self.size, self.view(rows).len() as u64)
    }

    /// Selects or deselects the row at `index`.
    pub fn set_selected(&mut self, index: usize, selected: bool) {
        if selected {
            self.selected.insert(index);
        } else {
            self.selected.remove(&index);
        }
    }

    /// Flips the selection of the row at `index`.
    pub fn toggle_selected(&mut self, index: usize) {
        let selected = !self.selected.contains(&index);
        self.set_selected(index, selected);
    }

    /// Selects every matching row, or clears the selection.
    pub fn select_all<R: TableRow>(&mut self, rows: &[R], selected: bool) {
        self.selected.clear();
        if selected {
            self.selected.extend(self.view(rows));
        }
    }

    /// Returns `true` if the row at `index` is selected.
    #[must_use]
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Returns the selected indices in ascending order.
    #[must_use]
    pub fn selected(&self) -> Vec<usize> {
        let mut selected: Vec<usize> = self.selected.iter().copied().collect();
        selected.sort_unstable();
        selected
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Summarizes the selection over the matching rows.
    pub fn selection<R: TableRow>(&self, rows: &[R]) -> Selection {
        let view = self.view(rows);
        let count = view.iter().filter(|i| self.selected.contains(i)).count();
        match count {
            0 => Selection::None,
            n if n == view.len() => Selection::All,
            _ => Selection::Partial,
        }
    }
}
