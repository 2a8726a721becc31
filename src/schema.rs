//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.

/// Customers table schema
pub mod customers {
    /// Table name
    pub const TABLE: &str = "customers";
    /// Primary key column
    pub const ID: &str = "id";
    /// Customer name column
    pub const NAME: &str = "name";
    /// Email address column (unique when present)
    pub const EMAIL: &str = "email";
    /// Postal address column
    pub const ADDRESS: &str = "address";
}

/// Products table schema
pub mod products {
    /// Table name
    pub const TABLE: &str = "products";
    /// Primary key column
    pub const ID: &str = "id";
    /// Product name column
    pub const NAME: &str = "name";
    /// Unit price column
    pub const PRICE: &str = "price";
    /// Category column
    pub const CATEGORY: &str = "category";
}

/// Sales table schema
pub mod sales {
    /// Table name
    pub const TABLE: &str = "sales";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to customers table
    pub const CUSTOMER_ID: &str = "customer_id";
    /// Foreign key to products table
    pub const PRODUCT_ID: &str = "product_id";
    /// Sale date column (ISO-8601 text)
    pub const SALE_DATE: &str = "sale_date";
    /// Sequence number disambiguating same-day repeat sales
    pub const SEQ: &str = "seq";
    /// Units sold column
    pub const QUANTITY: &str = "quantity";
    /// Invoiced amount column
    pub const TOTAL_AMOUNT: &str = "total_amount";
}
