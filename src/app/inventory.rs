use crate::domain::model::{FieldKind, Record, Shape, Value};
use crate::domain::ports::Entity;
use crate::utils::error::{Result, StoreError};
use crate::utils::validation::{
    validate_finite, validate_non_empty_string, validate_non_negative, Validate,
};
use std::fmt;

pub const PRODUCT_TAG: &str = "inventory::Product";

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub code: String,
    pub name: String,
    pub manufacturer: String,
    pub price: f64,
    pub quantity: i64,
}

impl Product {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        manufacturer: impl Into<String>,
        price: f64,
        quantity: i64,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            manufacturer: manufacturer.into(),
            price,
            quantity,
        }
    }

    /// Value of the whole batch. Never stored.
    pub fn total_cost(&self) -> f64 {
        self.price * self.quantity as f64
    }

    pub fn increase_price(&mut self, percentage: f64) -> Result<()> {
        validate_non_negative("percentage", percentage)?;
        validate_finite("percentage", percentage)?;
        let raised = self.price * (1.0 + percentage / 100.0);
        validate_finite("price", raised)?;
        self.price = raised;
        Ok(())
    }
}

impl Entity for Product {
    fn shapes() -> Vec<Shape> {
        vec![Shape::new(PRODUCT_TAG)
            .field("Code", FieldKind::Text)
            .field("Name", FieldKind::Text)
            .field("Manufacturer", FieldKind::Text)
            .field("Price", FieldKind::Decimal)
            .field("QuantityInBatch", FieldKind::Integer)
            .derived("TotalCost", FieldKind::Decimal)]
    }

    fn to_record(&self) -> Record {
        Record::new(PRODUCT_TAG)
            .with("Code", Value::Text(self.code.clone()))
            .with("Name", Value::Text(self.name.clone()))
            .with("Manufacturer", Value::Text(self.manufacturer.clone()))
            .with("Price", Value::Decimal(self.price))
            .with("QuantityInBatch", Value::Integer(self.quantity))
            .with("TotalCost", Value::Decimal(self.total_cost()))
    }

    fn from_record(record: &Record) -> Result<Self> {
        if record.tag != PRODUCT_TAG {
            return Err(StoreError::decode(format!(
                "expected {} but found {}",
                PRODUCT_TAG, record.tag
            )));
        }
        Ok(Self {
            code: record.text("Code")?,
            name: record.text("Name")?,
            manufacturer: record.text("Manufacturer")?,
            price: record.decimal("Price")?,
            quantity: record.integer("QuantityInBatch")?,
        })
    }
}

impl Validate for Product {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("code", &self.code)?;
        validate_non_empty_string("name", &self.name)?;
        validate_finite("price", self.price)?;
        validate_non_negative("price", self.price)?;
        validate_non_negative("quantity", self.quantity)?;
        Ok(())
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}), by {}, price {:.2}, batch of {}",
            self.name, self.code, self.manufacturer, self.price, self.quantity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_cost_is_derived() {
        let product = Product::new("P-001", "Widget", "Acme", 10.5, 3);
        assert_eq!(product.total_cost(), 31.5);

        let shape = &Product::shapes()[0];
        let record = product.to_record();
        assert_eq!(record.get("TotalCost"), Some(&Value::Decimal(31.5)));
        assert!(record.without_derived(shape).get("TotalCost").is_none());
    }

    #[test]
    fn test_record_conversion() {
        let product = Product::new("P-001", "Widget", "Acme", 10.5, 3);
        assert_eq!(Product::from_record(&product.to_record()).unwrap(), product);
    }

    #[test]
    fn test_validation() {
        assert!(Product::new("P-001", "Widget", "", 0.0, 0).validate().is_ok());
        assert!(Product::new(" ", "Widget", "Acme", 1.0, 1).validate().is_err());
        assert!(Product::new("P-1", "Widget", "Acme", -1.0, 1).validate().is_err());
        assert!(Product::new("P-1", "Widget", "Acme", 1.0, -1).validate().is_err());
    }

    #[test]
    fn test_increase_price() {
        let mut product = Product::new("P-001", "Widget", "Acme", 100.0, 1);
        product.increase_price(10.0).unwrap();
        assert!((product.price - 110.0).abs() < 1e-9);
        assert!(product.increase_price(-5.0).is_err());
    }

    #[test]
    fn test_increase_price_overflow_keeps_old_price() {
        let mut product = Product::new("P-001", "Widget", "Acme", 1e308, 1);
        let err = product.increase_price(100.0).unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
        assert_eq!(product.price, 1e308);
    }
}
