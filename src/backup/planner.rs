//! Dependency Planner.
//!
//! A fixed table topology encoding foreign key direction. Tables are kept
//! sorted by [`TableRole`], so a table always comes after every table it can
//! reference. Insert order walks the list forward, delete order walks it
//! backwards.

/// Where a table sits in the dependency topology.
///
/// Declaration order is dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableRole {
    /// Operator accounts: restored, never wiped by clear-all.
    Accounts,
    /// Key/value configuration: restored, filtered by the allow-list on clear-all.
    Settings,
    /// References nothing (categories, suppliers, customers).
    Independent,
    /// References independent tables (products).
    Dependent,
    /// Business transactions (sales, purchases).
    Transactional,
    /// Lines of a transaction (sale items, purchase items).
    LineItem,
}

impl TableRole {
    /// Whether clear-all deletes this table's rows unconditionally.
    pub fn cleared_by_clear_all(self) -> bool {
        !matches!(self, Self::Accounts | Self::Settings)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTable {
    pub name: String,
    pub role: TableRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyPlanner {
    tables: Vec<PlannedTable>,
}

impl DependencyPlanner {
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }

    /// The retail topology: core tables plus optional extension tables.
    pub fn retail() -> Self {
        Self::new()
            .with_table("users", TableRole::Accounts)
            .with_table("settings", TableRole::Settings)
            .with_table("categories", TableRole::Independent)
            .with_table("suppliers", TableRole::Independent)
            .with_table("customers", TableRole::Independent)
            .with_table("employees", TableRole::Independent)
            .with_table("expenses", TableRole::Independent)
            .with_table("products", TableRole::Dependent)
            .with_table("sales", TableRole::Transactional)
            .with_table("purchases", TableRole::Transactional)
            .with_table("payroll", TableRole::Transactional)
            .with_table("stock_adjustments", TableRole::Transactional)
            .with_table("sale_items", TableRole::LineItem)
            .with_table("purchase_items", TableRole::LineItem)
    }

    /// Add a table after every existing table of the same or an earlier role.
    /// Re-adding a known table moves it to the new role.
    pub fn with_table(mut self, name: impl Into<String>, role: TableRole) -> Self {
        let name = name.into();
        self.tables.retain(|t| t.name != name);
        let position = self
            .tables
            .iter()
            .position(|t| t.role > role)
            .unwrap_or(self.tables.len());
        self.tables.insert(position, PlannedTable { name, role });
        self
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }

    pub fn role_of(&self, name: &str) -> Option<TableRole> {
        self.tables.iter().find(|t| t.name == name).map(|t| t.role)
    }

    /// Every known table in insert order.
    pub fn insert_order(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    /// The configuration table, if the topology has one.
    pub fn settings_table(&self) -> Option<&str> {
        self.tables
            .iter()
            .find(|t| t.role == TableRole::Settings)
            .map(|t| t.name.as_str())
    }

    /// Tables a restore replaces: every known table that exists live.
    pub fn plan_restore(&self, live_tables: &[String]) -> RestorePlan {
        RestorePlan {
            insert_order: self.live(live_tables, |_| true),
        }
    }

    /// Tables clear-all empties, and the settings table it filters.
    pub fn plan_clear(&self, live_tables: &[String]) -> ClearPlan {
        let settings_table = self
            .settings_table()
            .filter(|name| live_tables.iter().any(|t| t == name))
            .map(str::to_string);
        ClearPlan {
            insert_order: self.live(live_tables, TableRole::cleared_by_clear_all),
            settings_table,
        }
    }

    fn live(&self, live_tables: &[String], include: impl Fn(TableRole) -> bool) -> Vec<String> {
        self.tables
            .iter()
            .filter(|t| include(t.role) && live_tables.iter().any(|live| live == &t.name))
            .map(|t| t.name.clone())
            .collect()
    }
}

impl Default for DependencyPlanner {
    fn default() -> Self {
        Self::retail()
    }
}

/// Tables a restore touches, computed per call against the live schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePlan {
    insert_order: Vec<String>,
}

impl RestorePlan {
    pub fn insert_order(&self) -> &[String] {
        &self.insert_order
    }

    pub fn delete_order(&self) -> impl Iterator<Item = &String> {
        self.insert_order.iter().rev()
    }

    pub fn contains(&self, table: &str) -> bool {
        self.insert_order.iter().any(|t| t == table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearPlan {
    insert_order: Vec<String>,
    settings_table: Option<String>,
}

impl ClearPlan {
    pub fn delete_order(&self) -> impl Iterator<Item = &String> {
        self.insert_order.iter().rev()
    }

    pub fn settings_table(&self) -> Option<&str> {
        self.settings_table.as_deref()
    }
}
