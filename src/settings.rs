//! Account settings and the start-of-day DTBP cap.

use std::fmt;

use crate::error::ValidationError;
use crate::policy::MarginPolicy;
use crate::types::{MAX_AMOUNT, Usd};

/// Intraday leverage for pattern day traders.
pub const PDT_MULTIPLIER: f64 = 4.0;
/// Intraday leverage for margin accounts not flagged PDT.
pub const NON_PDT_MULTIPLIER: f64 = 2.0;
/// Cash accounts carry no intraday leverage.
pub const CASH_MULTIPLIER: f64 = 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AccountType {
    #[default]
    Margin,
    Cash,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Margin => write!(f, "margin"),
            AccountType::Cash => write!(f, "cash"),
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "margin" => Ok(AccountType::Margin),
            "cash" => Ok(AccountType::Cash),
            other => Err(format!("unknown account type '{other}'")),
        }
    }
}

/// Start-of-day account state plus broker/policy selection.
///
/// All dollar amounts are non-negative.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AccountSettings {
    pub policy: MarginPolicy,
    /// Broker enforces its own leveraged-ETF DTBP multiple.
    pub broker_leveraged_etf_rule: bool,
    pub account_type: AccountType,
    pub pattern_day_trader: bool,
    pub start_equity: f64,
    pub start_maintenance: f64,
    pub start_cash: f64,
    /// Broker-reported DTBP. Takes precedence over the computed cap when > 0.
    pub dtbp_override: Option<f64>,
    /// Replaces the 25% standard requirement when set.
    pub default_requirement: Option<f64>,
}

impl AccountSettings {
    /// Margin account flagged PDT with the given equity and no open requirement.
    pub fn pdt(start_equity: f64) -> Self {
        Self {
            pattern_day_trader: true,
            start_equity,
            start_cash: start_equity,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: MarginPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// `max(0, start_equity - start_maintenance)`.
    #[inline]
    pub fn maintenance_excess(&self) -> f64 {
        (self.start_equity - self.start_maintenance).max(0.0)
    }

    /// Intraday leverage multiple for this account.
    pub fn leverage_multiplier(&self) -> f64 {
        match (self.account_type, self.pattern_day_trader) {
            (AccountType::Cash, _) => CASH_MULTIPLIER,
            (AccountType::Margin, true) => PDT_MULTIPLIER,
            (AccountType::Margin, false) => NON_PDT_MULTIPLIER,
        }
    }

    /// Validate the settings. Returns `Err` naming the first bad field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let amounts = [
            ("start_equity", self.start_equity),
            ("start_maintenance", self.start_maintenance),
            ("start_cash", self.start_cash),
        ];
        for (field, value) in amounts {
            if !(0.0..=MAX_AMOUNT).contains(&value) {
                return Err(ValidationError::InvalidSetting { field, value });
            }
        }
        if let Some(value) = self
            .dtbp_override
            .filter(|v| !(0.0..=MAX_AMOUNT).contains(v))
        {
            return Err(ValidationError::InvalidSetting {
                field: "dtbp_override",
                value,
            });
        }
        if let Some(value) = self
            .default_requirement
            .filter(|v| !v.is_finite() || *v <= 0.0 || *v > 1.0)
        {
            return Err(ValidationError::InvalidRequirement {
                key: "default_requirement".into(),
                value,
            });
        }
        Ok(())
    }
}

/// Where the starting cap came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CapSource {
    Override,
    Computed { multiplier: f64 },
}

/// Output of the settings resolver.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedCap {
    pub cap: f64,
    pub maintenance_excess: f64,
    pub source: CapSource,
}

impl fmt::Display for ResolvedCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            CapSource::Override => write!(
                f,
                "Start DTBP cap {} (broker-reported override)",
                Usd(self.cap)
            ),
            CapSource::Computed { multiplier } => write!(
                f,
                "Start DTBP cap {} = maintenance excess {} x {}",
                Usd(self.cap),
                Usd(self.maintenance_excess),
                multiplier
            ),
        }
    }
}

/// Derive the day's starting DTBP cap.
///
/// A positive override wins; otherwise the maintenance excess is scaled by
/// the account's leverage multiple (4 for PDT, 2 for other margin accounts).
pub fn resolve_cap(settings: &AccountSettings) -> ResolvedCap {
    let maintenance_excess = settings.maintenance_excess();
    match settings.dtbp_override.filter(|v| *v > 0.0) {
        Some(cap) => ResolvedCap {
            cap,
            maintenance_excess,
            source: CapSource::Override,
        },
        None => {
            let multiplier = settings.leverage_multiplier();
            ResolvedCap {
                cap: maintenance_excess * multiplier,
                maintenance_excess,
                source: CapSource::Computed { multiplier },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_type_parses() {
        assert_eq!("Cash".parse::<AccountType>(), Ok(AccountType::Cash));
        assert_eq!(AccountType::Margin.to_string(), "margin");
        assert!("ira".parse::<AccountType>().is_err());
    }

    #[test]
    fn pdt_cap_is_four_times_excess() {
        let resolved = resolve_cap(&AccountSettings::pdt(30_000.0));
        assert_eq!(resolved.cap, 120_000.0);
        assert_eq!(resolved.source, CapSource::Computed { multiplier: 4.0 });
    }

    #[test]
    fn non_pdt_cap_is_two_times_excess() {
        let settings = AccountSettings {
            start_equity: 30_000.0,
            start_maintenance: 10_000.0,
            ..AccountSettings::default()
        };
        assert_eq!(resolve_cap(&settings).cap, 40_000.0);
    }

    #[test]
    fn cash_account_has_no_leverage() {
        let settings = AccountSettings {
            account_type: AccountType::Cash,
            pattern_day_trader: true,
            start_equity: 5_000.0,
            ..AccountSettings::default()
        };
        assert_eq!(resolve_cap(&settings).cap, 5_000.0);
    }

    #[test]
    fn excess_clamped_at_zero() {
        let settings = AccountSettings {
            pattern_day_trader: true,
            start_equity: 10_000.0,
            start_maintenance: 15_000.0,
            ..AccountSettings::default()
        };
        let resolved = resolve_cap(&settings);
        assert_eq!(resolved.maintenance_excess, 0.0);
        assert_eq!(resolved.cap, 0.0);
    }

    #[test]
    fn positive_override_wins() {
        let settings = AccountSettings {
            dtbp_override: Some(75_000.0),
            ..AccountSettings::pdt(30_000.0)
        };
        let resolved = resolve_cap(&settings);
        assert_eq!(resolved.cap, 75_000.0);
        assert_eq!(resolved.source, CapSource::Override);
        assert!(resolved.to_string().contains("override"));
    }

    #[test]
    fn zero_override_ignored() {
        let settings = AccountSettings {
            dtbp_override: Some(0.0),
            ..AccountSettings::pdt(30_000.0)
        };
        assert_eq!(resolve_cap(&settings).cap, 120_000.0);
    }

    #[test]
    fn audit_text() {
        let resolved = resolve_cap(&AccountSettings::pdt(30_000.0));
        assert_eq!(
            resolved.to_string(),
            "Start DTBP cap $120000.00 = maintenance excess $30000.00 x 4"
        );
    }

    #[test]
    fn validate_rejects_negative_and_nan() {
        let bad = AccountSettings {
            start_equity: -1.0,
            ..AccountSettings::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::InvalidSetting { field: "start_equity", .. })
        ));

        let bad = AccountSettings {
            dtbp_override: Some(f64::NAN),
            ..AccountSettings::default()
        };
        assert!(bad.validate().is_err());

        let bad = AccountSettings {
            start_cash: 1e300,
            ..AccountSettings::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::InvalidSetting { field: "start_cash", .. })
        ));

        let bad = AccountSettings {
            default_requirement: Some(1.2),
            ..AccountSettings::default()
        };
        assert!(bad.validate().is_err());

        assert!(AccountSettings::pdt(1.0).validate().is_ok());
    }
}
