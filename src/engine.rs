//! Engine entry points: validate, resolve, sequence, replay, synthesize.

use log::info;
use rustc_hash::FxHashSet;

use crate::error::ValidationError;
use crate::replay::{EngineState, ReplayContext};
use crate::requirements::RequirementTable;
use crate::result::{CalculationResult, synthesize};
use crate::sequencer;
use crate::settings::{AccountSettings, resolve_cap};
use crate::trade::Trade;

/// Buying-power engine with an injected symbol requirement table.
///
/// Holds no per-run state: every call replays the full trade list from the
/// start-of-day settings, so concurrent calls never interact.
#[derive(Clone, Debug, Default)]
pub struct Engine {
    requirements: RequirementTable,
}

impl Engine {
    pub fn new(requirements: RequirementTable) -> Self {
        Self { requirements }
    }

    pub fn requirements(&self) -> &RequirementTable {
        &self.requirements
    }

    /// Replay `trades` against `settings` and return the snapshot.
    ///
    /// Only malformed input (negative sizes, non-finite values, duplicate ids)
    /// is rejected; every numeric condition of well-formed input is clamped
    /// and reported through the result's warnings.
    pub fn calculate(
        &self,
        settings: &AccountSettings,
        trades: &[Trade],
    ) -> Result<CalculationResult, ValidationError> {
        validate_inputs(settings, trades)?;

        let resolved = resolve_cap(settings);
        let ctx = ReplayContext::new(settings, &self.requirements);
        let state = sequencer::order(trades).into_iter().fold(
            EngineState::start(settings, &resolved),
            |mut state, trade| {
                state.apply(&ctx, trade);
                state
            },
        );
        let result = synthesize(state, &settings.policy);

        info!(
            "replayed {} trades: stock_bp={:.2} option_bp={:.2} warnings={}",
            trades.len(),
            result.stock_buying_power,
            result.option_buying_power,
            result.warnings.len()
        );
        Ok(result)
    }

    /// Preview the snapshot as if `hypothetical` had also executed.
    ///
    /// The caller's trade list is not modified.
    pub fn what_if(
        &self,
        settings: &AccountSettings,
        trades: &[Trade],
        hypothetical: &Trade,
    ) -> Result<CalculationResult, ValidationError> {
        let mut speculative = Vec::with_capacity(trades.len() + 1);
        speculative.extend_from_slice(trades);
        speculative.push(hypothetical.clone());
        self.calculate(settings, &speculative)
    }
}

/// Calculate with an empty symbol requirement table.
pub fn calculate(
    settings: &AccountSettings,
    trades: &[Trade],
) -> Result<CalculationResult, ValidationError> {
    Engine::default().calculate(settings, trades)
}

fn validate_inputs(settings: &AccountSettings, trades: &[Trade]) -> Result<(), ValidationError> {
    settings.validate()?;
    let mut seen = FxHashSet::default();
    for trade in trades {
        trade.validate()?;
        if !seen.insert(trade.id.as_str()) {
            return Err(ValidationError::DuplicateTradeId {
                id: trade.id.0.clone(),
            });
        }
    }
    Ok(())
}
