//! Smartphone sales database and the query tools exposed to the LLM.
//!
//! The table holds one row per model per month. All tools return JSON arrays
//! of row objects so tool results can be fed straight back to the model.

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};
use vendabot_core::{Error, Result};

use crate::{Tool, ToolContext, ToolSchema};

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS smartphone_sales (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model TEXT NOT NULL,
    manufacturer TEXT NOT NULL,
    month INTEGER NOT NULL,
    year INTEGER NOT NULL,
    units_sold INTEGER NOT NULL,
    revenue REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sales_period ON smartphone_sales(year, month);
";

pub struct SalesDb {
    conn: Mutex<Connection>,
}

impl SalesDb {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch(SCHEMA_SQL).map_err(db_err)?;
        info!(path = %path.display(), "Opened sales database");
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA_SQL).map_err(db_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("sales database lock poisoned".to_string()))
    }

    pub fn insert_sale(
        &self,
        model: &str,
        manufacturer: &str,
        month: i64,
        year: i64,
        units_sold: i64,
        revenue: f64,
    ) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO smartphone_sales (model, manufacturer, month, year, units_sold, revenue)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![model, manufacturer, month, year, units_sold, revenue],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Import rows from a CSV file with headers
    /// model,manufacturer,month,year,units_sold,revenue. Returns the number
    /// of rows inserted. The whole import runs in one transaction.
    pub fn import_csv(&self, path: &Path) -> Result<usize> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| Error::Database(format!("Failed to read CSV {}: {}", path.display(), e)))?;

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;
        let mut count = 0usize;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO smartphone_sales (model, manufacturer, month, year, units_sold, revenue)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(db_err)?;

            for record in reader.records() {
                let record = record
                    .map_err(|e| Error::Database(format!("Invalid CSV row: {}", e)))?;
                if record.len() < 6 {
                    return Err(Error::Database(format!(
                        "CSV row has {} fields, expected 6",
                        record.len()
                    )));
                }
                let month: i64 = record[2]
                    .trim()
                    .parse()
                    .map_err(|_| Error::Database(format!("Invalid month '{}'", &record[2])))?;
                let year: i64 = record[3]
                    .trim()
                    .parse()
                    .map_err(|_| Error::Database(format!("Invalid year '{}'", &record[3])))?;
                let units: i64 = record[4]
                    .trim()
                    .parse()
                    .map_err(|_| Error::Database(format!("Invalid units_sold '{}'", &record[4])))?;
                let revenue: f64 = record[5]
                    .trim()
                    .parse()
                    .map_err(|_| Error::Database(format!("Invalid revenue '{}'", &record[5])))?;

                stmt.execute(rusqlite::params![
                    record[0].trim(),
                    record[1].trim(),
                    month,
                    year,
                    units,
                    revenue
                ])
                .map_err(db_err)?;
                count += 1;
            }
        }
        tx.commit().map_err(db_err)?;
        info!(rows = count, path = %path.display(), "Imported sales CSV");
        Ok(count)
    }

    /// Run a query and return rows as a JSON array of objects keyed by
    /// column name.
    fn query_rows(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Value> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(db_err)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = stmt.query(params).map_err(db_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            let mut obj = serde_json::Map::new();
            for (i, name) in columns.iter().enumerate() {
                let value = match row.get_ref(i).map_err(db_err)? {
                    ValueRef::Null => Value::Null,
                    ValueRef::Integer(v) => Value::from(v),
                    ValueRef::Real(v) => Value::from(v),
                    ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
                    ValueRef::Blob(_) => Value::Null,
                };
                obj.insert(name.clone(), value);
            }
            out.push(Value::Object(obj));
        }
        debug!(sql = sql.trim(), rows = out.len(), "Sales query executed");
        Ok(Value::Array(out))
    }

    pub fn top_products(&self, limit: i64, month: Option<i64>, year: Option<i64>) -> Result<Value> {
        let mut sql = String::from(
            "SELECT model, manufacturer,
                    SUM(units_sold) AS units_sold,
                    SUM(revenue) AS revenue_total
             FROM smartphone_sales",
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        match (month, year) {
            (Some(m), Some(y)) => {
                sql.push_str(" WHERE month = ?1 AND year = ?2");
                params.push(Box::new(m));
                params.push(Box::new(y));
            }
            (None, Some(y)) => {
                sql.push_str(" WHERE year = ?1");
                params.push(Box::new(y));
            }
            _ => {}
        }
        sql.push_str(&format!(
            " GROUP BY model, manufacturer ORDER BY units_sold DESC LIMIT ?{}",
            params.len() + 1
        ));
        params.push(Box::new(limit));
        let refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        self.query_rows(&sql, &refs)
    }

    pub fn monthly_revenue(&self, month: i64, year: i64) -> Result<Value> {
        self.query_rows(
            "SELECT SUM(revenue) AS revenue_total,
                    SUM(units_sold) AS total_units
             FROM smartphone_sales
             WHERE month = ?1 AND year = ?2",
            &[&month, &year],
        )
    }

    pub fn product_sales_by_month(&self, month: i64, year: i64) -> Result<Value> {
        self.query_rows(
            "SELECT model, manufacturer, units_sold, revenue
             FROM smartphone_sales
             WHERE month = ?1 AND year = ?2
             ORDER BY units_sold DESC",
            &[&month, &year],
        )
    }

    pub fn product_sales(&self, product: &str, month: i64, year: i64) -> Result<Value> {
        let pattern = format!("%{}%", product.to_lowercase());
        self.query_rows(
            "SELECT model, manufacturer, units_sold, revenue
             FROM smartphone_sales
             WHERE lower(model) LIKE ?1 AND month = ?2 AND year = ?3",
            &[&pattern, &month, &year],
        )
    }

    pub fn comparison_by_manufacturer(&self, year: i64, month: Option<i64>) -> Result<Value> {
        let base = "SELECT manufacturer,
                    SUM(units_sold) AS total_units,
                    SUM(revenue) AS revenue_total
             FROM smartphone_sales";
        let tail = " GROUP BY manufacturer ORDER BY total_units DESC";
        match month {
            Some(m) => self.query_rows(
                &format!("{} WHERE year = ?1 AND month = ?2{}", base, tail),
                &[&year, &m],
            ),
            None => self.query_rows(&format!("{} WHERE year = ?1{}", base, tail), &[&year]),
        }
    }

    pub fn average_monthly_sales(&self, year: i64) -> Result<Value> {
        self.query_rows(
            "WITH monthly AS (
                 SELECT month,
                        SUM(revenue) AS monthly_revenue,
                        SUM(units_sold) AS monthly_units
                 FROM smartphone_sales
                 WHERE year = ?1
                 GROUP BY month
             )
             SELECT AVG(monthly_revenue) AS avg_revenue,
                    AVG(monthly_units) AS avg_units
             FROM monthly",
            &[&year],
        )
    }

    pub fn best_selling_month(&self, year: i64) -> Result<Value> {
        self.query_rows(
            "SELECT CASE month
                    WHEN 1 THEN 'Janeiro' WHEN 2 THEN 'Fevereiro' WHEN 3 THEN 'Março'
                    WHEN 4 THEN 'Abril' WHEN 5 THEN 'Maio' WHEN 6 THEN 'Junho'
                    WHEN 7 THEN 'Julho' WHEN 8 THEN 'Agosto' WHEN 9 THEN 'Setembro'
                    WHEN 10 THEN 'Outubro' WHEN 11 THEN 'Novembro' WHEN 12 THEN 'Dezembro'
                    END AS month_name,
                    SUM(revenue) AS revenue_total,
                    SUM(units_sold) AS total_units
             FROM smartphone_sales
             WHERE year = ?1
             GROUP BY month
             ORDER BY revenue_total DESC
             LIMIT 1",
            &[&year],
        )
    }

    pub fn least_sold_products(&self, year: i64, limit: i64) -> Result<Value> {
        self.query_rows(
            "SELECT model, manufacturer,
                    SUM(units_sold) AS units_sold,
                    SUM(revenue) AS revenue_total
             FROM smartphone_sales
             WHERE year = ?1
             GROUP BY model, manufacturer
             ORDER BY revenue_total ASC
             LIMIT ?2",
            &[&year, &limit],
        )
    }

    pub fn multiple_product_sales(&self, products: &[String], year: i64) -> Result<Value> {
        if products.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        let placeholders: Vec<String> =
            (1..=products.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT model, manufacturer,
                    SUM(units_sold) AS units_sold,
                    SUM(revenue) AS revenue_total
             FROM smartphone_sales
             WHERE lower(model) IN ({}) AND year = ?{}
             GROUP BY model, manufacturer
             ORDER BY revenue_total DESC",
            placeholders.join(", "),
            products.len() + 1
        );
        let lowered: Vec<String> = products.iter().map(|p| p.to_lowercase()).collect();
        let mut params: Vec<&dyn rusqlite::ToSql> = Vec::new();
        for p in &lowered {
            params.push(p);
        }
        params.push(&year);
        self.query_rows(&sql, &params)
    }

    /// High-level stats for the CLI status view.
    pub fn summary(&self) -> Result<Value> {
        self.query_rows(
            "SELECT COUNT(*) AS rows,
                    COUNT(DISTINCT model) AS models,
                    COUNT(DISTINCT manufacturer) AS manufacturers,
                    MIN(year) AS first_year,
                    MAX(year) AS last_year,
                    SUM(revenue) AS revenue_total
             FROM smartphone_sales",
            &[],
        )
    }
}

fn require_int(params: &Value, key: &str) -> Result<i64> {
    optional_int(params, key)?
        .ok_or_else(|| Error::Validation(format!("Missing required parameter '{}'", key)))
}

fn optional_int(params: &Value, key: &str) -> Result<Option<i64>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            .map(Some)
            .ok_or_else(|| Error::Validation(format!("Parameter '{}' must be an integer", key))),
    }
}

fn require_str(params: &Value, key: &str) -> Result<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::Validation(format!("Missing required parameter '{}'", key)))
}

fn require_str_array(params: &Value, key: &str) -> Result<Vec<String>> {
    let arr = params
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::Validation(format!("Parameter '{}' must be an array", key)))?;
    arr.iter()
        .map(|v| {
            v.as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| Error::Validation(format!("Parameter '{}' must contain strings", key)))
        })
        .collect()
}

pub struct TopProductsTool;

#[async_trait]
impl Tool for TopProductsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_top_products",
            description: "Returns the N best-selling products by units sold. Can be filtered by year, or by month and year.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "description": "How many products to return. Defaults to 1."},
                    "month": {"type": "integer", "description": "Month number 1-12. Requires year."},
                    "year": {"type": "integer", "description": "Four-digit year."}
                },
                "required": []
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        optional_int(params, "limit")?;
        optional_int(params, "month")?;
        optional_int(params, "year")?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let limit = optional_int(&params, "limit")?.unwrap_or(1);
        let month = optional_int(&params, "month")?;
        let year = optional_int(&params, "year")?;
        ctx.sales.top_products(limit, month, year)
    }
}

pub struct MonthlyRevenueTool;

#[async_trait]
impl Tool for MonthlyRevenueTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_monthly_revenue",
            description: "Returns the total revenue and total units sold for a specific month and year.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "month": {"type": "integer", "description": "Month number 1-12."},
                    "year": {"type": "integer", "description": "Four-digit year."}
                },
                "required": ["month", "year"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_int(params, "month")?;
        require_int(params, "year")?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        ctx.sales
            .monthly_revenue(require_int(&params, "month")?, require_int(&params, "year")?)
    }
}

pub struct ProductSalesByMonthTool;

#[async_trait]
impl Tool for ProductSalesByMonthTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_product_sales_by_month",
            description: "Returns all products sold in a specific month and year, ordered by units sold.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "month": {"type": "integer", "description": "Month number 1-12."},
                    "year": {"type": "integer", "description": "Four-digit year."}
                },
                "required": ["month", "year"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_int(params, "month")?;
        require_int(params, "year")?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        ctx.sales
            .product_sales_by_month(require_int(&params, "month")?, require_int(&params, "year")?)
    }
}

pub struct ProductSalesTool;

#[async_trait]
impl Tool for ProductSalesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_product_sales",
            description: "Returns the sales of a specific product in a given month and year. The product name is matched case-insensitively as a substring.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "product": {"type": "string", "description": "Product model name or part of it."},
                    "month": {"type": "integer", "description": "Month number 1-12."},
                    "year": {"type": "integer", "description": "Four-digit year."}
                },
                "required": ["product", "month", "year"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "product")?;
        require_int(params, "month")?;
        require_int(params, "year")?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        ctx.sales.product_sales(
            &require_str(&params, "product")?,
            require_int(&params, "month")?,
            require_int(&params, "year")?,
        )
    }
}

pub struct ManufacturerComparisonTool;

#[async_trait]
impl Tool for ManufacturerComparisonTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_comparison_by_manufacturer",
            description: "Returns total units and revenue per manufacturer for a year, optionally narrowed to one month.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "year": {"type": "integer", "description": "Four-digit year."},
                    "month": {"type": "integer", "description": "Optional month number 1-12."}
                },
                "required": ["year"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_int(params, "year")?;
        optional_int(params, "month")?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        ctx.sales.comparison_by_manufacturer(
            require_int(&params, "year")?,
            optional_int(&params, "month")?,
        )
    }
}

pub struct AverageMonthlySalesTool;

#[async_trait]
impl Tool for AverageMonthlySalesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_average_monthly_sales",
            description: "Calculates the average revenue and average units sold per month across a year.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "year": {"type": "integer", "description": "Four-digit year."}
                },
                "required": ["year"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_int(params, "year")?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        ctx.sales.average_monthly_sales(require_int(&params, "year")?)
    }
}

pub struct BestSellingMonthTool;

#[async_trait]
impl Tool for BestSellingMonthTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_best_selling_month",
            description: "Returns the month with the highest sales revenue in a year.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "year": {"type": "integer", "description": "Four-digit year."}
                },
                "required": ["year"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_int(params, "year")?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        ctx.sales.best_selling_month(require_int(&params, "year")?)
    }
}

pub struct LeastSoldProductsTool;

#[async_trait]
impl Tool for LeastSoldProductsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_least_sold_products",
            description: "Returns the N products with the lowest total revenue in a year.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "year": {"type": "integer", "description": "Four-digit year."},
                    "limit": {"type": "integer", "description": "How many products to return. Defaults to 1."}
                },
                "required": ["year"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_int(params, "year")?;
        optional_int(params, "limit")?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        ctx.sales.least_sold_products(
            require_int(&params, "year")?,
            optional_int(&params, "limit")?.unwrap_or(1),
        )
    }
}

pub struct MultipleProductSalesTool;

#[async_trait]
impl Tool for MultipleProductSalesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_multiple_product_sales",
            description: "Returns the yearly sales of several products at once. Model names are matched case-insensitively and must be exact.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "products": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of product model names."
                    },
                    "year": {"type": "integer", "description": "Four-digit year."}
                },
                "required": ["products", "year"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str_array(params, "products")?;
        require_int(params, "year")?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        ctx.sales.multiple_product_sales(
            &require_str_array(&params, "products")?,
            require_int(&params, "year")?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    fn seeded_db() -> SalesDb {
        let db = SalesDb::open_in_memory().unwrap();
        db.insert_sale("Galaxy S24", "Samsung", 5, 2024, 120, 360000.0).unwrap();
        db.insert_sale("Galaxy S24", "Samsung", 6, 2024, 150, 450000.0).unwrap();
        db.insert_sale("iPhone 15", "Apple", 5, 2024, 100, 500000.0).unwrap();
        db.insert_sale("iPhone 15", "Apple", 6, 2024, 90, 450000.0).unwrap();
        db.insert_sale("Moto G84", "Motorola", 6, 2024, 200, 200000.0).unwrap();
        db.insert_sale("Moto G84", "Motorola", 1, 2023, 50, 50000.0).unwrap();
        db
    }

    fn ctx(db: SalesDb) -> ToolContext {
        ToolContext {
            session_key: "test:chat".to_string(),
            channel: "test".to_string(),
            chat_id: "chat".to_string(),
            sales: Arc::new(db),
        }
    }

    #[test]
    fn test_top_products_year_filter() {
        let db = seeded_db();
        let rows = db.top_products(2, None, Some(2024)).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["model"], "Galaxy S24");
        assert_eq!(rows[0]["units_sold"], 270);
        assert_eq!(rows[1]["model"], "Moto G84");
    }

    #[test]
    fn test_top_products_month_and_year() {
        let db = seeded_db();
        let rows = db.top_products(1, Some(5), Some(2024)).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["model"], "Galaxy S24");
        assert_eq!(rows[0]["units_sold"], 120);
    }

    #[test]
    fn test_monthly_revenue_sums() {
        let db = seeded_db();
        let rows = db.monthly_revenue(6, 2024).unwrap();
        let row = &rows.as_array().unwrap()[0];
        assert_eq!(row["revenue_total"].as_f64().unwrap(), 1_100_000.0);
        assert_eq!(row["total_units"], 440);
    }

    #[test]
    fn test_product_sales_case_insensitive_substring() {
        let db = seeded_db();
        let rows = db.product_sales("IPHONE", 5, 2024).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["model"], "iPhone 15");
    }

    #[test]
    fn test_comparison_by_manufacturer() {
        let db = seeded_db();
        let rows = db.comparison_by_manufacturer(2024, None).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows[0]["manufacturer"], "Samsung");
        assert_eq!(rows[0]["total_units"], 270);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_average_monthly_sales() {
        let db = seeded_db();
        let rows = db.average_monthly_sales(2024).unwrap();
        let row = &rows.as_array().unwrap()[0];
        // Two months in 2024: May 860000, June 1100000.
        assert_eq!(row["avg_revenue"].as_f64().unwrap(), 980_000.0);
        assert_eq!(row["avg_units"].as_f64().unwrap(), 330.0);
    }

    #[test]
    fn test_best_selling_month_name() {
        let db = seeded_db();
        let rows = db.best_selling_month(2024).unwrap();
        let row = &rows.as_array().unwrap()[0];
        assert_eq!(row["month_name"], "Junho");
    }

    #[test]
    fn test_least_sold_products_orders_by_revenue_asc() {
        let db = seeded_db();
        let rows = db.least_sold_products(2024, 1).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows[0]["model"], "Moto G84");
    }

    #[test]
    fn test_multiple_product_sales() {
        let db = seeded_db();
        let products = vec!["galaxy s24".to_string(), "iphone 15".to_string()];
        let rows = db.multiple_product_sales(&products, 2024).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["model"], "iPhone 15");

        let empty = db.multiple_product_sales(&[], 2024).unwrap();
        assert!(empty.as_array().unwrap().is_empty());
    }

    #[test]
    fn test_import_csv() {
        let db = SalesDb::open_in_memory().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model,manufacturer,month,year,units_sold,revenue").unwrap();
        writeln!(file, "Galaxy S24,Samsung,5,2024,120,360000.50").unwrap();
        writeln!(file, "iPhone 15,Apple,5,2024,100,500000").unwrap();
        let count = db.import_csv(file.path()).unwrap();
        assert_eq!(count, 2);
        let summary = db.summary().unwrap();
        assert_eq!(summary.as_array().unwrap()[0]["rows"], 2);
    }

    #[tokio::test]
    async fn test_tool_validation_rejects_missing_year() {
        let tool = MonthlyRevenueTool;
        let err = tool.validate(&json!({"month": 6})).unwrap_err();
        assert!(err.to_string().contains("year"));
    }

    #[tokio::test]
    async fn test_tool_execute_with_string_integers() {
        let tool = MonthlyRevenueTool;
        let context = ctx(seeded_db());
        let params = json!({"month": "6", "year": "2024"});
        tool.validate(&params).unwrap();
        let rows = tool.execute(context, params).await.unwrap();
        assert_eq!(rows.as_array().unwrap()[0]["total_units"], 440);
    }
}
