use std::collections::BTreeMap;
use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("Invalid category '{0}'. Expected e.g. 'DDR4 RAM (데스크탑)'")]
pub struct CategoryParseError(String);

/// Memory technology generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Generation {
    Ddr5,
    Ddr4,
    Ddr3,
}

impl Generation {
    pub fn tag(&self) -> &'static str {
        match self {
            Generation::Ddr5 => "DDR5",
            Generation::Ddr4 => "DDR4",
            Generation::Ddr3 => "DDR3",
        }
    }

    /// Renders the speed or part-number token the way listings name it for
    /// this generation: DDR5 by clock, older generations by PC module code.
    pub fn speed_label(&self, speed: &str) -> String {
        match self {
            Generation::Ddr5 => format!("{speed}MHz"),
            Generation::Ddr4 => format!("PC4-{speed}"),
            Generation::Ddr3 => format!("PC3-{speed}"),
        }
    }
}

impl Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFactor {
    #[default]
    Desktop,
    Laptop,
}

impl FormFactor {
    pub fn label(&self) -> &'static str {
        match self {
            FormFactor::Desktop => "데스크탑",
            FormFactor::Laptop => "노트북",
        }
    }

    /// Suffix appended to product names listed under this form factor.
    pub fn product_suffix(&self) -> &'static str {
        match self {
            FormFactor::Desktop => "",
            FormFactor::Laptop => " (노트북)",
        }
    }
}

/// Partition key of both a snapshot and the current price table.
///
/// Serialized as its display label, e.g. `DDR4 RAM (데스크탑)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Category {
    pub generation: Generation,
    pub form_factor: FormFactor,
}

impl Category {
    pub const fn new(generation: Generation, form_factor: FormFactor) -> Self {
        Self {
            generation,
            form_factor,
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} RAM ({})", self.generation, self.form_factor.label())
    }
}

impl FromStr for Category {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CategoryParseError(s.to_string());

        let (tag, rest) = s.trim().split_once(" RAM (").ok_or_else(err)?;
        let label = rest.strip_suffix(')').ok_or_else(err)?;

        let generation = match tag {
            "DDR5" => Generation::Ddr5,
            "DDR4" => Generation::Ddr4,
            "DDR3" => Generation::Ddr3,
            _ => return Err(err()),
        };
        let form_factor = match label {
            "데스크탑" => FormFactor::Desktop,
            "노트북" => FormFactor::Laptop,
            _ => return Err(err()),
        };

        Ok(Category::new(generation, form_factor))
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.to_string()
    }
}

impl TryFrom<String> for Category {
    type Error = CategoryParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One observed offer for a specific module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub product: String,
    pub price: u64,
    pub price_formatted: String,
}

impl PriceRecord {
    pub fn new(product: impl Into<String>, price: u64) -> Self {
        Self {
            product: product.into(),
            price,
            price_formatted: format_price(price),
        }
    }
}

impl Display for PriceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:<36} {:>12}", self.product, self.price_formatted)
    }
}

/// All records extracted from one listing, partitioned by category.
pub type Snapshot = BTreeMap<Category, Vec<PriceRecord>>;

/// Renders a price with comma grouping and the won sign, e.g. `49,000원`.
pub fn format_price(price: u64) -> String {
    let digits = price.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped.push('원');
    grouped
}
