use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::user::Role;

/// One stage of an approval chain: who signs off, and from what amount
/// onwards the stage applies at all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLevel {
    pub ordinal: u32,
    pub role: Role,
    /// Inclusive lower bound; a level with threshold T applies when
    /// amount >= T. Absent means the level always applies.
    pub threshold: Option<Decimal>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("no applicable approval levels for request type `{request_type}`")]
    NoApplicableLevels { request_type: String },
    #[error("request type `{request_type}` has no levels configured")]
    EmptyRequestType { request_type: String },
    #[error("request type `{request_type}` repeats level ordinal {ordinal}")]
    DuplicateOrdinal { request_type: String, ordinal: u32 },
}

/// Static mapping from request type to its ordered approval levels.
/// Loaded once at process start; there is no live reconfiguration path.
#[derive(Clone, Debug, Default)]
pub struct PolicyCatalog {
    levels_by_type: HashMap<String, Vec<ApprovalLevel>>,
}

impl PolicyCatalog {
    pub fn new(request_types: Vec<(String, Vec<ApprovalLevel>)>) -> Result<Self, PolicyError> {
        let mut levels_by_type = HashMap::new();

        for (request_type, mut levels) in request_types {
            if levels.is_empty() {
                return Err(PolicyError::EmptyRequestType { request_type });
            }

            levels.sort_by_key(|level| level.ordinal);
            if let Some(window) =
                levels.windows(2).find(|pair| pair[0].ordinal == pair[1].ordinal)
            {
                return Err(PolicyError::DuplicateOrdinal {
                    request_type,
                    ordinal: window[0].ordinal,
                });
            }

            levels_by_type.insert(normalize_key(&request_type), levels);
        }

        Ok(Self { levels_by_type })
    }

    /// Catalog mirroring the stock procurement setup: every request passes
    /// level-1 approval, amounts from 1000 add level-2, from 10000 finance.
    pub fn stock() -> Self {
        let levels = vec![
            ApprovalLevel { ordinal: 1, role: Role::ApproverLevel1, threshold: None },
            ApprovalLevel {
                ordinal: 2,
                role: Role::ApproverLevel2,
                threshold: Some(Decimal::new(1_000, 0)),
            },
            ApprovalLevel {
                ordinal: 3,
                role: Role::Finance,
                threshold: Some(Decimal::new(10_000, 0)),
            },
        ];

        let request_types = ["office_supplies", "equipment", "services"]
            .into_iter()
            .map(|name| (name.to_string(), levels.clone()))
            .collect();

        Self::new(request_types).unwrap_or_default()
    }

    /// Configured request types, sorted for stable display.
    pub fn request_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.levels_by_type.keys().cloned().collect();
        types.sort();
        types
    }

    /// Ordered subset of levels applicable to a specific request.
    ///
    /// Levels are filtered independently against the amount; skipping a
    /// level never reorders the survivors. An empty result is a
    /// configuration error, surfaced so submission fails fast.
    pub fn resolve_levels(
        &self,
        request_type: &str,
        amount: Decimal,
    ) -> Result<Vec<ApprovalLevel>, PolicyError> {
        let resolved: Vec<ApprovalLevel> = self
            .levels_by_type
            .get(&normalize_key(request_type))
            .map(|levels| {
                levels
                    .iter()
                    .filter(|level| level.threshold.map_or(true, |t| amount >= t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if resolved.is_empty() {
            return Err(PolicyError::NoApplicableLevels {
                request_type: request_type.to_string(),
            });
        }

        Ok(resolved)
    }
}

fn normalize_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::user::Role;

    use super::{ApprovalLevel, PolicyCatalog, PolicyError};

    fn catalog() -> PolicyCatalog {
        PolicyCatalog::new(vec![(
            "equipment".to_string(),
            vec![
                ApprovalLevel { ordinal: 1, role: Role::ApproverLevel1, threshold: None },
                ApprovalLevel {
                    ordinal: 2,
                    role: Role::Finance,
                    threshold: Some(Decimal::new(1_000, 0)),
                },
                ApprovalLevel {
                    ordinal: 3,
                    role: Role::Admin,
                    threshold: Some(Decimal::new(10_000, 0)),
                },
            ],
        )])
        .expect("valid catalog")
    }

    #[test]
    fn thresholds_filter_levels_but_preserve_order() {
        let levels =
            catalog().resolve_levels("equipment", Decimal::new(5_000, 0)).expect("resolve");

        let roles: Vec<Role> = levels.iter().map(|level| level.role).collect();
        assert_eq!(roles, vec![Role::ApproverLevel1, Role::Finance]);
    }

    #[test]
    fn small_amount_resolves_to_single_level() {
        let levels = catalog().resolve_levels("equipment", Decimal::new(200, 0)).expect("resolve");
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].role, Role::ApproverLevel1);
    }

    #[test]
    fn amount_at_threshold_includes_the_level() {
        let levels =
            catalog().resolve_levels("equipment", Decimal::new(10_000, 0)).expect("resolve");
        assert_eq!(levels.len(), 3);
    }

    #[test]
    fn unknown_request_type_is_a_configuration_error() {
        let error = catalog()
            .resolve_levels("travel", Decimal::new(500, 0))
            .expect_err("unknown type must fail");
        assert_eq!(error, PolicyError::NoApplicableLevels { request_type: "travel".to_string() });
    }

    #[test]
    fn request_type_lookup_is_case_insensitive() {
        assert!(catalog().resolve_levels(" Equipment ", Decimal::new(500, 0)).is_ok());
    }

    #[test]
    fn empty_level_list_is_rejected_at_construction() {
        let error = PolicyCatalog::new(vec![("travel".to_string(), Vec::new())])
            .expect_err("empty levels must fail");
        assert_eq!(error, PolicyError::EmptyRequestType { request_type: "travel".to_string() });
    }

    #[test]
    fn duplicate_ordinals_are_rejected_at_construction() {
        let error = PolicyCatalog::new(vec![(
            "travel".to_string(),
            vec![
                ApprovalLevel { ordinal: 1, role: Role::ApproverLevel1, threshold: None },
                ApprovalLevel { ordinal: 1, role: Role::Finance, threshold: None },
            ],
        )])
        .expect_err("duplicate ordinal must fail");
        assert!(matches!(error, PolicyError::DuplicateOrdinal { ordinal: 1, .. }));
    }

    #[test]
    fn stock_catalog_covers_default_request_types() {
        let catalog = PolicyCatalog::stock();
        assert!(catalog.resolve_levels("office_supplies", Decimal::new(50, 0)).is_ok());
        assert!(catalog.resolve_levels("equipment", Decimal::new(50, 0)).is_ok());
        assert!(catalog.resolve_levels("services", Decimal::new(50, 0)).is_ok());
    }
}
