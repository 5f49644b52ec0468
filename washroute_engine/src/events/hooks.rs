use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{
    CommissionsCreatedEvent,
    EventHandler,
    EventProducer,
    Handler,
    OrderAssignedEvent,
    OrderStatusChangedEvent,
    PayoutResolvedEvent,
};

/// The publishing side of the hook system. APIs hold a copy and publish into every registered channel.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_assigned_producer: Vec<EventProducer<OrderAssignedEvent>>,
    pub status_changed_producer: Vec<EventProducer<OrderStatusChangedEvent>>,
    pub commissions_created_producer: Vec<EventProducer<CommissionsCreatedEvent>>,
    pub payout_resolved_producer: Vec<EventProducer<PayoutResolvedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_assigned(&self, event: OrderAssignedEvent) {
        for producer in &self.order_assigned_producer {
            trace!("📬️ Publishing order assigned event for {}", event.order.order_code);
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_status_changed(&self, event: OrderStatusChangedEvent) {
        for producer in &self.status_changed_producer {
            trace!("📬️ Publishing status change {} -> {} for {}", event.old_status, event.order.status, event.order.order_code);
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_commissions_created(&self, event: CommissionsCreatedEvent) {
        for producer in &self.commissions_created_producer {
            trace!("📬️ Publishing {} new commissions for order #{}", event.commissions.len(), event.order_id);
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payout_resolved(&self, event: PayoutResolvedEvent) {
        for producer in &self.payout_resolved_producer {
            trace!("📬️ Publishing payout resolution for {}", event.payout.reference);
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_assigned: Option<EventHandler<OrderAssignedEvent>>,
    pub on_status_changed: Option<EventHandler<OrderStatusChangedEvent>>,
    pub on_commissions_created: Option<EventHandler<CommissionsCreatedEvent>>,
    pub on_payout_resolved: Option<EventHandler<PayoutResolvedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_order_assigned: hooks.on_order_assigned.map(|f| EventHandler::new(buffer_size, f)),
            on_status_changed: hooks.on_status_changed.map(|f| EventHandler::new(buffer_size, f)),
            on_commissions_created: hooks.on_commissions_created.map(|f| EventHandler::new(buffer_size, f)),
            on_payout_resolved: hooks.on_payout_resolved.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_assigned {
            result.order_assigned_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_status_changed {
            result.status_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_commissions_created {
            result.commissions_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payout_resolved {
            result.payout_resolved_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task for every registered handler. Each task ends when the last producer for it is dropped.
    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_assigned {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_status_changed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_commissions_created {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payout_resolved {
            tokio::spawn(handler.start_handler());
        }
    }
}

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_assigned: Option<Handler<OrderAssignedEvent>>,
    pub on_status_changed: Option<Handler<OrderStatusChangedEvent>>,
    pub on_commissions_created: Option<Handler<CommissionsCreatedEvent>>,
    pub on_payout_resolved: Option<Handler<PayoutResolvedEvent>>,
}

impl EventHooks {
    pub fn on_order_assigned<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderAssignedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_assigned = Some(Arc::new(f));
        self
    }

    pub fn on_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderStatusChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_commissions_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CommissionsCreatedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_commissions_created = Some(Arc::new(f));
        self
    }

    pub fn on_payout_resolved<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PayoutResolvedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_payout_resolved = Some(Arc::new(f));
        self
    }
}
