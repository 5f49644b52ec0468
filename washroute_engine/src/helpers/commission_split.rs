//! The three-way revenue split.
//!
//! All amounts are in minor units. With `base` the items subtotal of the order:
//!
//! ```text
//! item_commission  = item_count × per_item_fee          (capped at base)
//! percentage_fee   = round(base × service_fee% / 100)
//! platform         = percentage_fee + item_commission
//! partner          = base − item_commission
//! rider            = delivery_fee
//! ```
//!
//! so that `platform + partner + rider == base + delivery_fee + percentage_fee`. The inputs come from the fee snapshot
//! stored on the order, never from the live fee schedule.
use washroute_common::Money;

use crate::db_types::{BeneficiaryRole, CommissionCalculation, CommissionType, ConfirmedBy, NewCommission, Order};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionSplit {
    pub platform: Money,
    pub rider: Money,
    pub partner: Money,
    pub calculation: CommissionCalculation,
}

impl CommissionSplit {
    pub fn for_order(order: &Order) -> Self {
        let base = order.pricing.items_subtotal;
        let item_count = order.item_count();
        // The partner payout can never go negative, even with a per-item fee larger than the item prices.
        let item_commission =
            order.fees.per_item_fee.checked_mul(item_count).unwrap_or(base).min(base).max(Money::zero());
        let percentage_fee = base.percent_of(order.fees.service_fee);
        let delivery_fee = order.fees.delivery_fee;
        let calculation = CommissionCalculation {
            base_amount: base,
            percentage: order.fees.service_fee,
            item_count,
            per_item_fee: order.fees.per_item_fee,
            item_commission,
            percentage_fee,
            delivery_fee,
        };
        Self {
            platform: percentage_fee + item_commission,
            rider: delivery_fee,
            partner: base - item_commission,
            calculation,
        }
    }

    pub fn total(&self) -> Money {
        self.platform + self.rider + self.partner
    }

    pub fn amount_for(&self, role: BeneficiaryRole) -> Money {
        match role {
            BeneficiaryRole::Platform => self.platform,
            BeneficiaryRole::Rider => self.rider,
            BeneficiaryRole::Partner => self.partner,
        }
    }
}

fn commission_type_for(role: BeneficiaryRole) -> CommissionType {
    match role {
        BeneficiaryRole::Platform => CommissionType::PlatformFee,
        BeneficiaryRole::Rider => CommissionType::DeliveryFee,
        BeneficiaryRole::Partner => CommissionType::ServiceFee,
    }
}

/// The commission records the order is due, given who is assigned right now.
///
/// The platform share is always included. Rider and partner shares are only included when that party is assigned;
/// an unassigned role is left out rather than created with a zero amount.
pub fn plan_commissions(order: &Order, confirmed_by: ConfirmedBy) -> Vec<NewCommission> {
    let split = CommissionSplit::for_order(order);
    [BeneficiaryRole::Platform, BeneficiaryRole::Rider, BeneficiaryRole::Partner]
        .into_iter()
        .filter(|role| *role == BeneficiaryRole::Platform || order.beneficiary_for(*role).is_some())
        .map(|role| NewCommission {
            order_id: order.id,
            beneficiary_id: order.beneficiary_for(role).map(String::from),
            beneficiary_role: role,
            commission_type: commission_type_for(role),
            amount: split.amount_for(role),
            calculation: split.calculation,
            order_status: order.status,
            confirmed_by,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use sqlx::types::Json;
    use washroute_common::Percentage;

    use super::*;
    use crate::db_types::{
        ClientSnapshot,
        DeliveryLocation,
        FeeSchedule,
        OrderCode,
        OrderItem,
        OrderStatusType,
        PaymentStatus,
        PricingBreakdown,
    };

    fn order_with(items: Vec<OrderItem>, fees: FeeSchedule, rider: Option<&str>, partner: Option<&str>) -> Order {
        let pricing = PricingBreakdown::calculate(&items, &fees).unwrap();
        Order {
            id: 1,
            order_code: OrderCode::from("WR-TEST0001"),
            client_id: "client-1".into(),
            client: Json(ClientSnapshot {
                phone: "+233200000000".into(),
                display_name: "Ama".into(),
                location: DeliveryLocation { address: "Osu".into(), latitude: 5.55, longitude: -0.18 },
            }),
            items: Json(items),
            pricing,
            fees,
            currency: "GHS".into(),
            status: OrderStatusType::Delivered,
            rider_id: rider.map(String::from),
            partner_id: partner.map(String::from),
            payment_reference: "WRPAY_1".into(),
            payment_status: PaymentStatus::Success,
            paid_at: Some(Utc::now()),
            is_confirmed_by_client: true,
            is_admin_confirmed: false,
            is_disbursed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn standard_fees() -> FeeSchedule {
        FeeSchedule::new(Percentage::from_percent(9.0).unwrap(), Money::from_major(10), Money::from_major(1))
    }

    #[test]
    fn worked_example() {
        // Subtotal 50.00 over 2 line items, 9% fee, 1.00 per item, 10.00 delivery
        let items = vec![OrderItem::new("Shirt", Money::from(1500), 2), OrderItem::new("Duvet", Money::from(2000), 1)];
        let order = order_with(items, standard_fees(), Some("rider-1"), Some("partner-1"));
        let split = CommissionSplit::for_order(&order);
        assert_eq!(split.calculation.item_commission, Money::from(200));
        assert_eq!(split.calculation.percentage_fee, Money::from(450));
        assert_eq!(split.platform, Money::from(650));
        assert_eq!(split.partner, Money::from(4800));
        assert_eq!(split.rider, Money::from(1000));
        assert_eq!(split.total(), Money::from(6450));
        assert_eq!(split.total(), order.pricing.items_subtotal + order.fees.delivery_fee + order.pricing.service_fee_amount);
    }

    #[test]
    fn shares_partition_the_payable_amount() {
        let fee_grid = [(0.0, 0, 0), (9.0, 1000, 100), (12.5, 0, 250), (33.33, 1234, 7), (100.0, 500, 10_000)];
        let baskets = [
            vec![OrderItem::new("A", Money::from(1), 1)],
            vec![OrderItem::new("A", Money::from(999), 3), OrderItem::new("B", Money::from(1), 7)],
            vec![OrderItem::new("A", Money::from(12_345), 2)],
        ];
        for (pct, delivery, per_item) in fee_grid {
            let fees = FeeSchedule::new(Percentage::from_percent(pct).unwrap(), Money::from(delivery), Money::from(per_item));
            for items in &baskets {
                let order = order_with(items.clone(), fees, Some("r"), Some("p"));
                let split = CommissionSplit::for_order(&order);
                let expected = order.pricing.items_subtotal + fees.delivery_fee + split.calculation.percentage_fee;
                assert_eq!(split.total(), expected, "fees {fees}, items {items:?}");
                assert!(!split.partner.is_negative());
            }
        }
    }

    #[test]
    fn huge_per_item_fee_never_makes_partner_negative() {
        let fees = FeeSchedule::new(Percentage::from_percent(0.0).unwrap(), Money::zero(), Money::from(10_000));
        let order = order_with(vec![OrderItem::new("Sock", Money::from(50), 1)], fees, Some("r"), Some("p"));
        let split = CommissionSplit::for_order(&order);
        assert_eq!(split.partner, Money::zero());
        assert_eq!(split.platform, Money::from(50));
    }

    #[test]
    fn unassigned_roles_are_omitted() {
        let items = vec![OrderItem::new("Shirt", Money::from(1000), 1)];
        let order = order_with(items.clone(), standard_fees(), None, Some("partner-1"));
        let plan = plan_commissions(&order, ConfirmedBy::Admin);
        let roles = plan.iter().map(|c| c.beneficiary_role).collect::<Vec<_>>();
        assert_eq!(roles, vec![BeneficiaryRole::Platform, BeneficiaryRole::Partner]);
        assert_eq!(plan[0].beneficiary_id, None);
        assert_eq!(plan[1].beneficiary_id.as_deref(), Some("partner-1"));
        assert!(plan.iter().all(|c| c.confirmed_by == ConfirmedBy::Admin));

        let order = order_with(items, standard_fees(), None, None);
        assert_eq!(plan_commissions(&order, ConfirmedBy::System).len(), 1);
    }

    #[test]
    fn full_assignment_yields_three_typed_records() {
        let order = order_with(vec![OrderItem::new("Shirt", Money::from(1000), 1)], standard_fees(), Some("r"), Some("p"));
        let plan = plan_commissions(&order, ConfirmedBy::Client);
        let types = plan.iter().map(|c| c.commission_type).collect::<Vec<_>>();
        assert_eq!(types, vec![CommissionType::PlatformFee, CommissionType::DeliveryFee, CommissionType::ServiceFee]);
        assert!(plan.iter().all(|c| c.order_status == OrderStatusType::Delivered));
    }
}
