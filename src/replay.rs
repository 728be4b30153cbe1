//! Trade replay state machine.
//!
//! [`EngineState`] is created per run, threaded through a fold over the
//! ordered trades, and handed to the result synthesizer. Nothing here
//! outlives one call to the engine.

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::policy::{CreditBack, MarginPolicy, Pool, ProceedsAvailability};
use crate::position::{Closed, POSITION_EPSILON, Position};
use crate::requirements::RequirementTable;
use crate::settings::{AccountSettings, ResolvedCap};
use crate::side::{Action, Side};
use crate::trade::Trade;
use crate::types::{Symbol, Usd};

/// Margin-call warning text. Untagged so repeated detections collapse.
pub const MARGIN_CALL_WARNING: &str =
    "Margin call risk: equity is below the maintenance requirement";

/// Read-only inputs consulted by every replay step.
#[derive(Clone, Copy, Debug)]
pub struct ReplayContext<'a> {
    pub policy: &'a MarginPolicy,
    pub requirements: &'a RequirementTable,
    pub default_requirement: Option<f64>,
    pub broker_leveraged_etf_rule: bool,
}

impl<'a> ReplayContext<'a> {
    pub fn new(settings: &'a AccountSettings, requirements: &'a RequirementTable) -> Self {
        Self {
            policy: &settings.policy,
            requirements,
            default_requirement: settings.default_requirement,
            broker_leveraged_etf_rule: settings.broker_leveraged_etf_rule,
        }
    }
}

/// Insertion-ordered, de-duplicated warning list.
#[derive(Clone, Debug, Default)]
pub struct Warnings {
    seen: FxHashSet<String>,
    ordered: Vec<String>,
}

impl Warnings {
    /// Add a warning unless an identical one was already recorded.
    pub fn push(&mut self, warning: String) -> bool {
        if self.seen.contains(&warning) {
            return false;
        }
        self.seen.insert(warning.clone());
        self.ordered.push(warning);
        true
    }

    pub fn contains(&self, warning: &str) -> bool {
        self.seen.contains(warning)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

/// Running account state during one replay.
#[derive(Clone, Debug)]
pub struct EngineState {
    pub dtbp_cap: f64,
    pub dtbp_used: f64,
    pub maintenance: f64,
    pub equity: f64,
    pub cash: f64,
    /// Sale proceeds not yet spendable.
    pub pending_proceeds: f64,
    pub positions: FxHashMap<Symbol, Position>,
    pub warnings: Warnings,
    pub audit: Vec<String>,
}

impl EngineState {
    /// Seed the state from start-of-day settings and the resolved cap.
    pub fn start(settings: &AccountSettings, resolved: &ResolvedCap) -> Self {
        let audit = vec![
            resolved.to_string(),
            format!("Policy: {}", settings.policy),
        ];
        Self {
            dtbp_cap: resolved.cap,
            dtbp_used: 0.0,
            maintenance: settings.start_maintenance,
            equity: settings.start_equity,
            cash: settings.start_cash,
            pending_proceeds: 0.0,
            positions: FxHashMap::default(),
            warnings: Warnings::default(),
            audit,
        }
    }

    /// Remaining DTBP, negative when the cap is exceeded.
    #[inline]
    pub fn dtbp_remaining(&self) -> f64 {
        self.dtbp_cap - self.dtbp_used
    }

    /// Equity minus maintenance requirement, negative on a margin call.
    #[inline]
    pub fn excess(&self) -> f64 {
        self.equity - self.maintenance
    }

    /// Fold one trade into the state.
    pub fn apply(&mut self, ctx: &ReplayContext<'_>, trade: &Trade) {
        match trade.side.action() {
            Action::Entry => self.apply_entry(ctx, trade),
            Action::Exit => self.apply_exit(ctx, trade),
        }
        if self
            .positions
            .get(&trade.symbol)
            .is_some_and(Position::is_flat)
        {
            self.positions.remove(&trade.symbol);
        }

        self.audit.push(format!(
            "  equity {}, maintenance {}, excess {}, DTBP remaining {}",
            Usd(self.equity),
            Usd(self.maintenance),
            Usd(self.excess()),
            Usd(self.dtbp_remaining()),
        ));

        if self.dtbp_remaining() < 0.0 {
            self.warnings.push(format!(
                "DTBP exceeded after trade {}: used {} of {} cap",
                trade.id,
                Usd(self.dtbp_used),
                Usd(self.dtbp_cap),
            ));
        }
        if self.excess() < 0.0 {
            self.warnings.push(MARGIN_CALL_WARNING.to_string());
        }
    }

    fn apply_entry(&mut self, ctx: &ReplayContext<'_>, trade: &Trade) {
        let notional = trade.notional();
        let (pct, rule) = ctx.requirements.requirement(trade, ctx.default_requirement);
        let draw = ctx.policy.entry_draw(trade, ctx.broker_leveraged_etf_rule);

        let position = self
            .positions
            .entry(trade.symbol.clone())
            .or_insert_with(|| Position::new(trade.symbol.clone(), trade.kind));
        let fill = position.apply_entry(
            trade.side.sign() * trade.quantity,
            trade.price,
            Usd(notional * pct),
            Usd(draw.dtbp),
        );

        // The netted share closes the opposite position like an exit: it
        // neither draws DTBP nor adds a requirement.
        let requirement = notional * pct * fill.opened_fraction;
        let dtbp = draw.dtbp * fill.opened_fraction;
        self.dtbp_used += dtbp;
        self.maintenance += requirement;
        self.equity -= trade.fees;

        match trade.side {
            Side::SellShort if ctx.policy.short_credit_spendable => {
                self.cash += notional - trade.fees;
            }
            Side::SellShort => self.cash -= trade.fees,
            _ => self.cash -= trade.total_cost(),
        }

        let draw_text = match draw.pool {
            Pool::Cash => format!("paid from cash, cash now {}", Usd(self.cash)),
            Pool::Dtbp if draw.multiple > 1.0 => format!(
                "DTBP +{} ({}x leverage penalty)",
                Usd(dtbp),
                draw.multiple
            ),
            Pool::Dtbp => format!("DTBP +{}", Usd(dtbp)),
        };
        self.audit.push(format!(
            "{trade}: notional {}, requirement {:.0}% ({rule}) = {}, {draw_text}",
            Usd(notional),
            pct * 100.0,
            Usd(requirement),
        ));

        if let Some(closed) = fill.netted.filter(|c| c.quantity > 0.0) {
            self.audit.push(format!(
                "  nets {} against the opposite open position, realized P&L {}",
                closed.quantity, closed.realized_pnl
            ));
            self.release(ctx, &closed);
        }

        if draw.pool == Pool::Cash && self.cash < 0.0 {
            self.warnings.push(format!(
                "Option trade {} exceeds available cash: cash {}",
                trade.id,
                Usd(self.cash)
            ));
        }
        debug!(
            "entry {} {}: dtbp_used={:.2} maintenance={:.2}",
            trade.id, trade.symbol, self.dtbp_used, self.maintenance
        );
    }

    fn apply_exit(&mut self, ctx: &ReplayContext<'_>, trade: &Trade) {
        let closing_short = trade.side == Side::BuyToCover;
        let closed = match self.positions.get_mut(&trade.symbol) {
            Some(p) if (closing_short && p.is_short()) || (!closing_short && p.is_long()) => {
                p.close(trade.quantity, trade.price)
            }
            _ => Closed::default(),
        };

        // Quantity with no intraday position behind it: a prior-day holding.
        // Released at the trade's own requirement rate, no P&L (basis unknown).
        let unmatched = trade.quantity - closed.quantity;
        let mut unmatched_release = 0.0;
        if unmatched >= POSITION_EPSILON {
            let (pct, _) =
                ctx.requirements
                    .requirement_for(trade, closing_short, ctx.default_requirement);
            unmatched_release = unmatched * trade.price * trade.kind.multiplier() * pct;
            let detail = if closed.quantity > 0.0 {
                format!("exceeds the open position by {unmatched}")
            } else {
                "has no matching open position".to_string()
            };
            self.warnings.push(format!(
                "Exit {} {} {detail}; treated as closing a prior-day holding",
                trade.id, trade.symbol
            ));
        }

        let before = self.maintenance;
        // Matched quantity releases what its entries added, not notional x
        // rate at this exit's price.
        self.release(ctx, &closed);
        self.maintenance = (self.maintenance - unmatched_release).max(0.0);
        self.equity -= trade.fees;

        let notional = trade.notional();
        match (trade.side, ctx.policy.proceeds) {
            (Side::Sell, ProceedsAvailability::SameDay) => self.cash += notional - trade.fees,
            (Side::Sell, ProceedsAvailability::Pending) => {
                self.pending_proceeds += notional - trade.fees;
            }
            _ => self.cash -= trade.total_cost(),
        }

        let credit_text = match ctx.policy.credit_back {
            CreditBack::Standard => {
                let credit = ctx.policy.exit_credit(closed.dtbp_released.value());
                format!("DTBP credit {}", Usd(credit))
            }
            CreditBack::Conservative => "no DTBP credit-back".to_string(),
        };
        self.audit.push(format!(
            "{trade}: realized P&L {}, requirement released {}, {credit_text}",
            closed.realized_pnl,
            Usd(before - self.maintenance),
        ));
        debug!(
            "exit {} {}: closed={} pnl={:.2} dtbp_used={:.2}",
            trade.id,
            trade.symbol,
            closed.quantity,
            closed.realized_pnl.value(),
            self.dtbp_used
        );
    }

    /// Apply the global effects of a closed portion: requirement release,
    /// realized P&L, and the policy's DTBP credit.
    ///
    /// Releases the requirement the position carries for the closed share,
    /// not `notional * rate` at the exit price. The two differ only when the
    /// rate or price moved since entry; the carried amount is what was added.
    fn release(&mut self, ctx: &ReplayContext<'_>, closed: &Closed) {
        self.maintenance = (self.maintenance - closed.maintenance_released.value()).max(0.0);
        self.equity += closed.realized_pnl.value();
        let credit = ctx
            .policy
            .exit_credit(closed.dtbp_released.value())
            .min(self.dtbp_used);
        self.dtbp_used -= credit;
    }
}
