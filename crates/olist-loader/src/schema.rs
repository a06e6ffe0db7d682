//! Static dataset registry
//!
//! Each [`DatasetSpec`] maps one source CSV to one destination table and lists
//! the coercions applied to its columns. The built-in Olist registry is checked
//! at compile time; registries assembled at runtime go through
//! [`SchemaRegistry::new`], which runs the same checks.

use crate::error::ConfigError;

/// Coercion applied to a column by the cleaner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Kept as text
    Text,
    /// Text with CR/LF replaced by spaces
    FreeText,
    Numeric,
    Temporal,
}

/// One source-to-destination mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetSpec {
    /// Destination table name, also used as the dataset name
    pub name: &'static str,
    /// Source file name relative to the data directory
    pub file: &'static str,
    /// Columns to load, in destination order
    pub columns: &'static [&'static str],
    pub numeric: &'static [&'static str],
    pub temporal: &'static [&'static str],
    pub free_text: &'static [&'static str],
}

/// Static configuration defect found in a [`DatasetSpec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecProblem {
    NoColumns,
    BadIdentifier(&'static str),
    DuplicateColumn(&'static str),
    Undeclared {
        set: &'static str,
        column: &'static str,
    },
    ConflictingKinds(&'static str),
}

impl std::fmt::Display for SpecProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecProblem::NoColumns => write!(f, "no columns declared"),
            SpecProblem::BadIdentifier(ident) => {
                write!(f, "'{}' is not a plain SQL identifier", ident)
            },
            SpecProblem::DuplicateColumn(column) => {
                write!(f, "column '{}' is declared twice", column)
            },
            SpecProblem::Undeclared { set, column } => {
                write!(f, "{} column '{}' is not in the column list", set, column)
            },
            SpecProblem::ConflictingKinds(column) => write!(
                f,
                "column '{}' has more than one of free-text, numeric, temporal",
                column
            ),
        }
    }
}

impl DatasetSpec {
    /// Coercion for a declared column
    pub fn kind_of(&self, column: &str) -> ColumnKind {
        if contains(self.numeric, column) {
            ColumnKind::Numeric
        } else if contains(self.temporal, column) {
            ColumnKind::Temporal
        } else if contains(self.free_text, column) {
            ColumnKind::FreeText
        } else {
            ColumnKind::Text
        }
    }

    /// First configuration defect, if any. Usable in const context.
    pub const fn problem(&self) -> Option<SpecProblem> {
        if self.columns.is_empty() {
            return Some(SpecProblem::NoColumns);
        }
        if !is_identifier(self.name) {
            return Some(SpecProblem::BadIdentifier(self.name));
        }

        let mut i = 0;
        while i < self.columns.len() {
            let column = self.columns[i];
            if !is_identifier(column) {
                return Some(SpecProblem::BadIdentifier(column));
            }
            let mut j = i + 1;
            while j < self.columns.len() {
                if str_eq(column, self.columns[j]) {
                    return Some(SpecProblem::DuplicateColumn(column));
                }
                j += 1;
            }
            i += 1;
        }

        let sets: [(&'static str, &'static [&'static str]); 3] = [
            ("numeric", self.numeric),
            ("temporal", self.temporal),
            ("free-text", self.free_text),
        ];
        let mut s = 0;
        while s < sets.len() {
            let (set, members) = sets[s];
            let mut k = 0;
            while k < members.len() {
                if !contains(self.columns, members[k]) {
                    return Some(SpecProblem::Undeclared {
                        set,
                        column: members[k],
                    });
                }
                let mut t = s + 1;
                while t < sets.len() {
                    if contains(sets[t].1, members[k]) {
                        return Some(SpecProblem::ConflictingKinds(members[k]));
                    }
                    t += 1;
                }
                k += 1;
            }
            s += 1;
        }

        None
    }
}

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

const fn contains(list: &[&str], needle: &str) -> bool {
    let mut i = 0;
    while i < list.len() {
        if str_eq(list[i], needle) {
            return true;
        }
        i += 1;
    }
    false
}

/// `[A-Za-z_][A-Za-z0-9_]*`
const fn is_identifier(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.is_empty() || !(bytes[0].is_ascii_alphabetic() || bytes[0] == b'_') {
        return false;
    }
    let mut i = 1;
    while i < bytes.len() {
        if !(bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
            return false;
        }
        i += 1;
    }
    true
}

/// The nine Olist e-commerce exports, in load order
pub const OLIST_DATASETS: &[DatasetSpec] = &[
    DatasetSpec {
        name: "category_translation",
        file: "product_category_name_translation.csv",
        columns: &["product_category_name", "product_category_name_english"],
        numeric: &[],
        temporal: &[],
        free_text: &[],
    },
    DatasetSpec {
        name: "customers",
        file: "olist_customers_dataset.csv",
        columns: &[
            "customer_id",
            "customer_unique_id",
            "customer_zip_code_prefix",
            "customer_city",
            "customer_state",
        ],
        numeric: &[],
        temporal: &[],
        free_text: &[],
    },
    DatasetSpec {
        name: "geolocation_raw",
        file: "olist_geolocation_dataset.csv",
        columns: &[
            "geolocation_zip_code_prefix",
            "geolocation_lat",
            "geolocation_lng",
            "geolocation_city",
            "geolocation_state",
        ],
        numeric: &["geolocation_lat", "geolocation_lng"],
        temporal: &[],
        free_text: &[],
    },
    DatasetSpec {
        name: "orders",
        file: "olist_orders_dataset.csv",
        columns: &[
            "order_id",
            "customer_id",
            "order_status",
            "order_purchase_timestamp",
            "order_approved_at",
            "order_delivered_carrier_date",
            "order_delivered_customer_date",
            "order_estimated_delivery_date",
        ],
        numeric: &[],
        temporal: &[
            "order_purchase_timestamp",
            "order_approved_at",
            "order_delivered_carrier_date",
            "order_delivered_customer_date",
            "order_estimated_delivery_date",
        ],
        free_text: &[],
    },
    DatasetSpec {
        name: "order_items",
        file: "olist_order_items_dataset.csv",
        columns: &[
            "order_id",
            "order_item_id",
            "product_id",
            "seller_id",
            "shipping_limit_date",
            "price",
            "freight_value",
        ],
        numeric: &["order_item_id", "price", "freight_value"],
        temporal: &["shipping_limit_date"],
        free_text: &[],
    },
    DatasetSpec {
        name: "order_payments",
        file: "olist_order_payments_dataset.csv",
        columns: &[
            "order_id",
            "payment_sequential",
            "payment_type",
            "payment_installments",
            "payment_value",
        ],
        numeric: &["payment_sequential", "payment_installments", "payment_value"],
        temporal: &[],
        free_text: &[],
    },
    DatasetSpec {
        name: "order_reviews",
        file: "olist_order_reviews_dataset.csv",
        columns: &[
            "review_id",
            "order_id",
            "review_score",
            "review_comment_title",
            "review_comment_message",
            "review_creation_date",
            "review_answer_timestamp",
        ],
        numeric: &["review_score"],
        temporal: &["review_creation_date", "review_answer_timestamp"],
        free_text: &["review_comment_title", "review_comment_message"],
    },
    DatasetSpec {
        name: "products",
        file: "olist_products_dataset.csv",
        columns: &[
            "product_id",
            "product_category_name",
            "product_name_lenght",
            "product_description_lenght",
            "product_photos_qty",
            "product_weight_g",
            "product_length_cm",
            "product_height_cm",
            "product_width_cm",
        ],
        numeric: &[
            "product_name_lenght",
            "product_description_lenght",
            "product_photos_qty",
            "product_weight_g",
            "product_length_cm",
            "product_height_cm",
            "product_width_cm",
        ],
        temporal: &[],
        free_text: &[],
    },
    DatasetSpec {
        name: "sellers",
        file: "olist_sellers_dataset.csv",
        columns: &[
            "seller_id",
            "seller_zip_code_prefix",
            "seller_city",
            "seller_state",
        ],
        numeric: &[],
        temporal: &[],
        free_text: &[],
    },
];

const fn registry_is_valid(datasets: &[DatasetSpec]) -> bool {
    let mut i = 0;
    while i < datasets.len() {
        if datasets[i].problem().is_some() {
            return false;
        }
        let mut j = i + 1;
        while j < datasets.len() {
            if str_eq(datasets[i].name, datasets[j].name) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(
    registry_is_valid(OLIST_DATASETS),
    "built-in Olist registry has an invalid dataset spec"
);

/// Ordered, validated set of dataset specs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRegistry {
    datasets: Vec<DatasetSpec>,
}

impl SchemaRegistry {
    /// Validate and wrap a list of specs
    pub fn new(datasets: Vec<DatasetSpec>) -> Result<Self, ConfigError> {
        for (i, spec) in datasets.iter().enumerate() {
            if let Some(problem) = spec.problem() {
                return Err(ConfigError::InvalidDataset {
                    dataset: spec.name.to_string(),
                    reason: problem.to_string(),
                });
            }
            if datasets[..i].iter().any(|d| d.name == spec.name) {
                return Err(ConfigError::InvalidDataset {
                    dataset: spec.name.to_string(),
                    reason: "dataset name is registered twice".to_string(),
                });
            }
        }
        Ok(Self { datasets })
    }

    /// Built-in Olist registry
    pub fn olist() -> Self {
        Self {
            datasets: OLIST_DATASETS.to_vec(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DatasetSpec> {
        self.datasets.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetSpec> {
        self.datasets.iter()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Restrict to `names`, keeping registry order. An empty selection keeps everything.
    pub fn select<S: AsRef<str>>(self, names: &[S]) -> Result<Self, ConfigError> {
        if names.is_empty() {
            return Ok(self);
        }
        if let Some(unknown) = names.iter().find(|n| self.get(n.as_ref()).is_none()) {
            return Err(ConfigError::UnknownDataset(unknown.as_ref().to_string()));
        }
        let datasets = self
            .datasets
            .into_iter()
            .filter(|d| names.iter().any(|n| n.as_ref() == d.name))
            .collect();
        Ok(Self { datasets })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const REVIEWS: DatasetSpec = DatasetSpec {
        name: "reviews",
        file: "reviews.csv",
        columns: &["id", "score", "comment", "created_at"],
        numeric: &["score"],
        temporal: &["created_at"],
        free_text: &["comment"],
    };

    #[test]
    fn test_builtin_registry() {
        let registry = SchemaRegistry::olist();
        assert_eq!(registry.len(), 9);
        assert_eq!(registry.iter().next().unwrap().name, "category_translation");
        assert_eq!(registry.iter().last().unwrap().name, "sellers");
        assert!(SchemaRegistry::new(OLIST_DATASETS.to_vec()).is_ok());
    }

    #[test]
    fn test_kind_of() {
        assert_eq!(REVIEWS.kind_of("id"), ColumnKind::Text);
        assert_eq!(REVIEWS.kind_of("score"), ColumnKind::Numeric);
        assert_eq!(REVIEWS.kind_of("created_at"), ColumnKind::Temporal);
        assert_eq!(REVIEWS.kind_of("comment"), ColumnKind::FreeText);
    }

    #[test]
    fn test_problem_free_text_also_numeric() {
        let spec = DatasetSpec {
            numeric: &["score", "comment"],
            ..REVIEWS
        };
        assert_eq!(spec.problem(), Some(SpecProblem::ConflictingKinds("comment")));
    }

    #[test]
    fn test_problem_numeric_also_temporal() {
        let spec = DatasetSpec {
            temporal: &["created_at", "score"],
            ..REVIEWS
        };
        assert_eq!(spec.problem(), Some(SpecProblem::ConflictingKinds("score")));
    }

    #[test]
    fn test_problem_undeclared_column() {
        let spec = DatasetSpec {
            temporal: &["answered_at"],
            ..REVIEWS
        };
        assert_eq!(
            spec.problem(),
            Some(SpecProblem::Undeclared {
                set: "temporal",
                column: "answered_at"
            })
        );
    }

    #[test]
    fn test_problem_identifiers() {
        let spec = DatasetSpec {
            name: "order reviews",
            ..REVIEWS
        };
        assert_eq!(spec.problem(), Some(SpecProblem::BadIdentifier("order reviews")));

        let spec = DatasetSpec {
            columns: &["id", "id"],
            numeric: &[],
            temporal: &[],
            free_text: &[],
            ..REVIEWS
        };
        assert_eq!(spec.problem(), Some(SpecProblem::DuplicateColumn("id")));

        let spec = DatasetSpec {
            columns: &["1st"],
            numeric: &[],
            temporal: &[],
            free_text: &[],
            ..REVIEWS
        };
        assert_eq!(spec.problem(), Some(SpecProblem::BadIdentifier("1st")));
    }

    #[test]
    fn test_new_rejects_invalid_and_duplicates() {
        let bad = DatasetSpec {
            free_text: &["missing"],
            ..REVIEWS
        };
        let err = SchemaRegistry::new(vec![bad]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDataset { ref dataset, .. } if dataset == "reviews"));

        let err = SchemaRegistry::new(vec![REVIEWS, REVIEWS]).unwrap_err();
        assert!(err.to_string().contains("registered twice"));
    }

    #[test]
    fn test_select_keeps_registry_order() {
        let registry = SchemaRegistry::olist()
            .select(&["sellers", "orders"])
            .unwrap();
        let names: Vec<_> = registry.iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["orders", "sellers"]);
    }

    #[test]
    fn test_select_unknown() {
        let err = SchemaRegistry::olist().select(&["payments"]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDataset(ref n) if n == "payments"));
    }

    #[test]
    fn test_select_empty_keeps_all() {
        let none: &[&str] = &[];
        assert_eq!(SchemaRegistry::olist().select(none).unwrap().len(), 9);
    }
}
