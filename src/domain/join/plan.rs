//! Membership plan catalogue and subscription line item composition.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MinorUnits, ValidationError};

use super::request::{Donation, ValidatedJoin};

/// A membership plan the wizard can offer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MembershipPlan {
    /// Value the client sends in `membership`.
    pub id: String,

    #[serde(default)]
    pub label: String,

    /// Billing provider plan / item price id.
    pub item_price_id: String,

    /// Price per billing period, minor units.
    pub unit_amount: i64,

    /// Present when this is a "suggested contribution" meta-plan.
    #[serde(default)]
    pub suggested: Option<SuggestedContribution>,
}

/// A meta-plan billed as a concrete base plan plus a contribution add-on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SuggestedContribution {
    pub base_item_price_id: String,
    pub base_unit_amount: i64,
    pub add_on_item_price_id: String,
}

/// Billing items used for donations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DonationItems {
    /// Charged once with the first invoice.
    #[serde(default)]
    pub one_off_item_price_id: String,
    /// Recurring add-on billed every period.
    #[serde(default)]
    pub recurring_item_price_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    Plan,
    AddOn,
    OneOffCharge,
}

/// One item on a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_price_id: String,
    pub quantity: u32,
    pub unit_amount: MinorUnits,
    pub kind: LineItemKind,
}

impl LineItem {
    fn new(item_price_id: &str, unit_amount: MinorUnits, kind: LineItemKind) -> Self {
        Self {
            item_price_id: item_price_id.to_string(),
            quantity: 1,
            unit_amount,
            kind,
        }
    }
}

/// Resolved plan id and the items to bill for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPlan {
    pub plan_id: String,
    pub line_items: Vec<LineItem>,
}

/// All configured plans plus donation items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlanCatalog {
    #[serde(default)]
    pub plans: Vec<MembershipPlan>,
    #[serde(default)]
    pub donation: DonationItems,
}

impl PlanCatalog {
    pub fn find(&self, plan_id: &str) -> Option<&MembershipPlan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    /// Every billing plan id that counts as a membership.
    pub fn membership_family(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for plan in &self.plans {
            ids.push(plan.item_price_id.clone());
            if let Some(suggested) = &plan.suggested {
                ids.push(suggested.base_item_price_id.clone());
            }
        }
        ids.sort();
        ids.dedup();
        ids
    }

    /// Builds the subscription for a validated join.
    pub fn compose(
        &self,
        membership: &str,
        join: &ValidatedJoin,
    ) -> Result<SubscriptionPlan, ValidationError> {
        let plan = self
            .find(membership)
            .ok_or_else(|| ValidationError::unsupported("membership", "unknown membership plan"))?;

        let mut line_items = Vec::new();
        let plan_id = match &plan.suggested {
            Some(suggested) => {
                let base = MinorUnits::new(suggested.base_unit_amount);
                line_items.push(LineItem::new(
                    &suggested.base_item_price_id,
                    base,
                    LineItemKind::Plan,
                ));

                let chosen = join
                    .custom_membership_amount
                    .unwrap_or(MinorUnits::new(plan.unit_amount));
                if chosen < base {
                    return Err(ValidationError::invalid_format(
                        "customMembershipAmount",
                        "below the minimum membership amount",
                    ));
                }
                let contribution = chosen.saturating_sub(base);
                if !contribution.is_zero() {
                    line_items.push(LineItem::new(
                        &suggested.add_on_item_price_id,
                        contribution,
                        LineItemKind::AddOn,
                    ));
                }
                suggested.base_item_price_id.clone()
            }
            None => {
                line_items.push(LineItem::new(
                    &plan.item_price_id,
                    MinorUnits::new(plan.unit_amount),
                    LineItemKind::Plan,
                ));
                plan.item_price_id.clone()
            }
        };

        if let Some(donation) = join.donation {
            line_items.push(self.donation_item(donation)?);
        }

        Ok(SubscriptionPlan {
            plan_id,
            line_items,
        })
    }

    fn donation_item(&self, donation: Donation) -> Result<LineItem, ValidationError> {
        let (item_price_id, kind) = if donation.recurring {
            (&self.donation.recurring_item_price_id, LineItemKind::AddOn)
        } else {
            (&self.donation.one_off_item_price_id, LineItemKind::OneOffCharge)
        };
        if item_price_id.is_empty() {
            return Err(ValidationError::unsupported(
                "donationAmount",
                "donations are not configured",
            ));
        }
        Ok(LineItem::new(item_price_id, donation.amount, kind))
    }
}
