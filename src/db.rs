use std::fs;
use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{
    CategoryBreakdown, DateRange, DbCustomer, DbProduct, DbSale, NewCustomer, NewProduct, NewSale,
    SaleDetail, TopEntry, UpsertOutcome,
};
use crate::schema::{customers, products, sales};
use crate::validation::InputValidator;

// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database manager for handling connections and operations
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database connection pool with default pool settings
    pub fn new(database_url: &str) -> Result<Self> {
        Self::with_pool_settings(database_url, 10, Duration::from_secs(30))
    }

    /// Create a new database connection pool
    pub fn with_pool_settings(
        database_url: &str,
        max_connections: u32,
        connection_timeout: Duration,
    ) -> Result<Self> {
        InputValidator::validate_database_url(database_url)?;

        let file_path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        let file_path = file_path.strip_prefix("//").unwrap_or(file_path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Set up connection manager and pool; foreign keys are off by default in SQLite
        let manager = SqliteConnectionManager::file(file_path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(max_connections)
            .connection_timeout(connection_timeout)
            .build(manager)?;

        // Run migrations
        let conn = pool.get()?;
        Self::run_migrations(&conn)?;

        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!("../migrations/2025-06-01-000000_create_tables/up.sql"))?;

        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Map a database row to a DbCustomer
    fn map_customer(row: &Row) -> rusqlite::Result<DbCustomer> {
        Ok(DbCustomer {
            id: row.get(customers::ID)?,
            name: row.get(customers::NAME)?,
            email: row.get(customers::EMAIL)?,
            address: row.get(customers::ADDRESS)?,
        })
    }

    /// Map a database row to a DbProduct
    fn map_product(row: &Row) -> rusqlite::Result<DbProduct> {
        Ok(DbProduct {
            id: row.get(products::ID)?,
            name: row.get(products::NAME)?,
            price: row.get(products::PRICE)?,
            category: row.get(products::CATEGORY)?,
        })
    }

    /// Map a database row to a DbSale
    fn map_sale(row: &Row) -> rusqlite::Result<DbSale> {
        Ok(DbSale {
            id: row.get(sales::ID)?,
            customer_id: row.get(sales::CUSTOMER_ID)?,
            product_id: row.get(sales::PRODUCT_ID)?,
            sale_date: row.get(sales::SALE_DATE)?,
            seq: row.get(sales::SEQ)?,
            quantity: row.get(sales::QUANTITY)?,
            total_amount: row.get(sales::TOTAL_AMOUNT)?,
        })
    }

    /// Get a customer by email
    pub fn get_customer_by_email(&self, email: &str) -> Result<Option<DbCustomer>> {
        let conn = self.get_connection()?;

        let customer = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?", customers::TABLE, customers::EMAIL),
                params![email],
                Self::map_customer,
            )
            .optional()?;

        Ok(customer)
    }

    /// Get a customer by name
    pub fn get_customer_by_name(&self, name: &str) -> Result<Option<DbCustomer>> {
        let conn = self.get_connection()?;

        let customer = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ? ORDER BY {} ASC",
                    customers::TABLE,
                    customers::NAME,
                    customers::ID
                ),
                params![name],
                Self::map_customer,
            )
            .optional()?;

        Ok(customer)
    }

    /// Resolve a sale's customer reference: an email when it looks like one, else a name
    pub fn resolve_customer_ref(&self, reference: &str) -> Result<Option<DbCustomer>> {
        if reference.contains('@') {
            if let Some(customer) = self.get_customer_by_email(reference)? {
                return Ok(Some(customer));
            }
        }
        self.get_customer_by_name(reference)
    }

    /// Insert or refresh a customer, matched by email when present, else by name.
    ///
    /// A name match with no stored email adopts the incoming email, so a source
    /// file that gains emails over time does not duplicate customers.
    pub fn upsert_customer(&self, new: &NewCustomer) -> Result<(DbCustomer, UpsertOutcome)> {
        let existing = match &new.email {
            Some(email) => match self.get_customer_by_email(email)? {
                Some(found) => Some(found),
                None => self
                    .get_customer_by_name(&new.name)?
                    .filter(|c| c.email.is_none()),
            },
            None => self.get_customer_by_name(&new.name)?,
        };

        let conn = self.get_connection()?;

        if let Some(customer) = existing {
            let unchanged = customer.name == new.name
                && customer.email == new.email
                && customer.address == new.address;
            if unchanged {
                return Ok((customer, UpsertOutcome::Unchanged));
            }

            conn.execute(
                &format!(
                    "UPDATE {} SET {} = ?, {} = ?, {} = ? WHERE {} = ?",
                    customers::TABLE,
                    customers::NAME,
                    customers::EMAIL,
                    customers::ADDRESS,
                    customers::ID
                ),
                params![new.name, new.email, new.address, customer.id],
            )?;

            Ok((
                DbCustomer {
                    id: customer.id,
                    name: new.name.clone(),
                    email: new.email.clone(),
                    address: new.address.clone(),
                },
                UpsertOutcome::Updated,
            ))
        } else {
            conn.execute(
                &format!(
                    "INSERT INTO {} ({}, {}, {}) VALUES (?, ?, ?)",
                    customers::TABLE,
                    customers::NAME,
                    customers::EMAIL,
                    customers::ADDRESS
                ),
                params![new.name, new.email, new.address],
            )?;

            let id = conn.last_insert_rowid();
            Ok((
                DbCustomer {
                    id,
                    name: new.name.clone(),
                    email: new.email.clone(),
                    address: new.address.clone(),
                },
                UpsertOutcome::Inserted,
            ))
        }
    }

    /// Get a product by its natural key (name + category)
    pub fn get_product(&self, name: &str, category: &str) -> Result<Option<DbProduct>> {
        let conn = self.get_connection()?;

        let product = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ? AND {} = ?",
                    products::TABLE,
                    products::NAME,
                    products::CATEGORY
                ),
                params![name, category],
                Self::map_product,
            )
            .optional()?;

        Ok(product)
    }

    /// Get a product by name alone, used to resolve sale references
    pub fn get_product_by_name(&self, name: &str) -> Result<Option<DbProduct>> {
        let conn = self.get_connection()?;

        let product = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ? ORDER BY {} ASC",
                    products::TABLE,
                    products::NAME,
                    products::ID
                ),
                params![name],
                Self::map_product,
            )
            .optional()?;

        Ok(product)
    }

    /// Insert or refresh a product, matched by name + category
    pub fn upsert_product(&self, new: &NewProduct) -> Result<(DbProduct, UpsertOutcome)> {
        let existing = self.get_product(&new.name, &new.category)?;

        let conn = self.get_connection()?;

        if let Some(product) = existing {
            if (product.price - new.price).abs() < f64::EPSILON {
                return Ok((product, UpsertOutcome::Unchanged));
            }

            conn.execute(
                &format!(
                    "UPDATE {} SET {} = ? WHERE {} = ?",
                    products::TABLE,
                    products::PRICE,
                    products::ID
                ),
                params![new.price, product.id],
            )?;

            Ok((
                DbProduct {
                    id: product.id,
                    name: product.name,
                    price: new.price,
                    category: product.category,
                },
                UpsertOutcome::Updated,
            ))
        } else {
            conn.execute(
                &format!(
                    "INSERT INTO {} ({}, {}, {}) VALUES (?, ?, ?)",
                    products::TABLE,
                    products::NAME,
                    products::PRICE,
                    products::CATEGORY
                ),
                params![new.name, new.price, new.category],
            )?;

            let id = conn.last_insert_rowid();
            Ok((
                DbProduct {
                    id,
                    name: new.name.clone(),
                    price: new.price,
                    category: new.category.clone(),
                },
                UpsertOutcome::Inserted,
            ))
        }
    }

    /// Insert or refresh a sale, matched by its natural composite key
    /// (customer, product, date, sequence)
    pub fn upsert_sale(&self, new: &NewSale) -> Result<(DbSale, UpsertOutcome)> {
        let conn = self.get_connection()?;

        let existing: Option<DbSale> = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ? AND {} = ? AND {} = ? AND {} = ?",
                    sales::TABLE,
                    sales::CUSTOMER_ID,
                    sales::PRODUCT_ID,
                    sales::SALE_DATE,
                    sales::SEQ
                ),
                params![new.customer_id, new.product_id, new.sale_date, new.seq],
                Self::map_sale,
            )
            .optional()?;

        if let Some(sale) = existing {
            let unchanged =
                sale.quantity == new.quantity && (sale.total_amount - new.total_amount).abs() < f64::EPSILON;
            if unchanged {
                return Ok((sale, UpsertOutcome::Unchanged));
            }

            conn.execute(
                &format!(
                    "UPDATE {} SET {} = ?, {} = ? WHERE {} = ?",
                    sales::TABLE,
                    sales::QUANTITY,
                    sales::TOTAL_AMOUNT,
                    sales::ID
                ),
                params![new.quantity, new.total_amount, sale.id],
            )?;

            Ok((
                DbSale {
                    quantity: new.quantity,
                    total_amount: new.total_amount,
                    ..sale
                },
                UpsertOutcome::Updated,
            ))
        } else {
            conn.execute(
                &format!(
                    "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?)",
                    sales::TABLE,
                    sales::CUSTOMER_ID,
                    sales::PRODUCT_ID,
                    sales::SALE_DATE,
                    sales::SEQ,
                    sales::QUANTITY,
                    sales::TOTAL_AMOUNT
                ),
                params![
                    new.customer_id,
                    new.product_id,
                    new.sale_date,
                    new.seq,
                    new.quantity,
                    new.total_amount
                ],
            )?;

            let id = conn.last_insert_rowid();
            Ok((
                DbSale {
                    id,
                    customer_id: new.customer_id,
                    product_id: new.product_id,
                    sale_date: new.sale_date,
                    seq: new.seq,
                    quantity: new.quantity,
                    total_amount: new.total_amount,
                },
                UpsertOutcome::Inserted,
            ))
        }
    }

    /// Get the [MIN(sale_date), MAX(sale_date)] window over all stored sales
    pub fn date_bounds(&self) -> Result<Option<DateRange>> {
        let conn = self.get_connection()?;

        let bounds: (Option<chrono::NaiveDate>, Option<chrono::NaiveDate>) = conn.query_row(
            &format!(
                "SELECT MIN({}), MAX({}) FROM {}",
                sales::SALE_DATE,
                sales::SALE_DATE,
                sales::TABLE
            ),
            params![],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        match bounds {
            (Some(start), Some(end)) => Ok(Some(DateRange { start, end })),
            _ => Ok(None),
        }
    }

    /// Get joined sale detail rows within an inclusive date window, oldest first
    pub fn sales_between(&self, range: &DateRange) -> Result<Vec<SaleDetail>> {
        let conn = self.get_connection()?;

        let query = format!(
            "SELECT s.{id}, s.{date}, c.{cname} AS customer, p.{pname} AS product, \
             p.{category}, s.{quantity}, s.{amount} \
             FROM {sales} s \
             JOIN {customers} c ON s.{cust_fk} = c.{cid} \
             JOIN {products} p ON s.{prod_fk} = p.{pid} \
             WHERE s.{date} BETWEEN ? AND ? \
             ORDER BY s.{date} ASC, s.{id} ASC",
            id = sales::ID,
            date = sales::SALE_DATE,
            cname = customers::NAME,
            pname = products::NAME,
            category = products::CATEGORY,
            quantity = sales::QUANTITY,
            amount = sales::TOTAL_AMOUNT,
            sales = sales::TABLE,
            customers = customers::TABLE,
            products = products::TABLE,
            cust_fk = sales::CUSTOMER_ID,
            cid = customers::ID,
            prod_fk = sales::PRODUCT_ID,
            pid = products::ID,
        );

        let mut stmt = conn.prepare(&query)?;
        let detail_iter = stmt.query_map(params![range.start, range.end], |row| {
            Ok(SaleDetail {
                sale_id: row.get(0)?,
                date: row.get(1)?,
                customer: row.get(2)?,
                product: row.get(3)?,
                category: row.get(4)?,
                quantity: row.get(5)?,
                amount: row.get(6)?,
            })
        })?;

        let mut results = Vec::new();
        for detail in detail_iter {
            results.push(detail?);
        }

        Ok(results)
    }

    /// Get the per-category breakdown within a window, ordered by total amount descending
    pub fn category_breakdown(&self, range: &DateRange) -> Result<Vec<CategoryBreakdown>> {
        let conn = self.get_connection()?;

        let query = format!(
            "SELECT p.{category}, SUM(s.{amount}) AS total, COUNT(*) AS transactions \
             FROM {sales} s \
             JOIN {products} p ON s.{prod_fk} = p.{pid} \
             WHERE s.{date} BETWEEN ? AND ? \
             GROUP BY p.{category} \
             ORDER BY total DESC, p.{category} ASC",
            category = products::CATEGORY,
            amount = sales::TOTAL_AMOUNT,
            sales = sales::TABLE,
            products = products::TABLE,
            prod_fk = sales::PRODUCT_ID,
            pid = products::ID,
            date = sales::SALE_DATE,
        );

        let mut stmt = conn.prepare(&query)?;
        let breakdown_iter = stmt.query_map(params![range.start, range.end], |row| {
            let total: f64 = row.get(1)?;
            let transactions: i64 = row.get(2)?;
            Ok(CategoryBreakdown {
                category: row.get(0)?,
                total,
                transactions: transactions as usize,
                average: ((total / transactions as f64) * 100.0).round() / 100.0,
            })
        })?;

        let mut results = Vec::new();
        for breakdown in breakdown_iter {
            results.push(breakdown?);
        }

        Ok(results)
    }

    /// Get the best-selling product by summed amount; ties break on the smaller name
    pub fn top_product(&self, range: &DateRange) -> Result<Option<TopEntry>> {
        self.top_entry(
            range,
            &format!(
                "SELECT p.{name}, SUM(s.{amount}) AS total \
                 FROM {sales} s \
                 JOIN {products} p ON s.{prod_fk} = p.{pid} \
                 WHERE s.{date} BETWEEN ? AND ? \
                 GROUP BY p.{name} \
                 ORDER BY total DESC, p.{name} ASC \
                 LIMIT 1",
                name = products::NAME,
                amount = sales::TOTAL_AMOUNT,
                sales = sales::TABLE,
                products = products::TABLE,
                prod_fk = sales::PRODUCT_ID,
                pid = products::ID,
                date = sales::SALE_DATE,
            ),
        )
    }

    /// Get the top customer by summed spend; ties break on the smaller name
    pub fn top_customer(&self, range: &DateRange) -> Result<Option<TopEntry>> {
        self.top_entry(
            range,
            &format!(
                "SELECT c.{name}, SUM(s.{amount}) AS total \
                 FROM {sales} s \
                 JOIN {customers} c ON s.{cust_fk} = c.{cid} \
                 WHERE s.{date} BETWEEN ? AND ? \
                 GROUP BY c.{name} \
                 ORDER BY total DESC, c.{name} ASC \
                 LIMIT 1",
                name = customers::NAME,
                amount = sales::TOTAL_AMOUNT,
                sales = sales::TABLE,
                customers = customers::TABLE,
                cust_fk = sales::CUSTOMER_ID,
                cid = customers::ID,
                date = sales::SALE_DATE,
            ),
        )
    }

    fn top_entry(&self, range: &DateRange, query: &str) -> Result<Option<TopEntry>> {
        let conn = self.get_connection()?;

        let entry = conn
            .query_row(query, params![range.start, range.end], |row| {
                Ok(TopEntry {
                    name: row.get(0)?,
                    amount: row.get(1)?,
                })
            })
            .optional()?;

        Ok(entry)
    }

    /// Count rows in one of the three tables; used for idempotence checks
    pub fn count_rows(&self, table: &str) -> Result<usize> {
        let conn = self.get_connection()?;

        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), params![], |row| {
            row.get(0)
        })?;

        Ok(count as usize)
    }
}
