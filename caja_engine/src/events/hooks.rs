use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderSettledEvent,
    TransferConfirmedEvent,
    TransferPendingEvent,
    TransferRejectedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_settled_producer: Vec<EventProducer<OrderSettledEvent>>,
    pub transfer_pending_producer: Vec<EventProducer<TransferPendingEvent>>,
    pub transfer_confirmed_producer: Vec<EventProducer<TransferConfirmedEvent>>,
    pub transfer_rejected_producer: Vec<EventProducer<TransferRejectedEvent>>,
}

pub struct EventHandlers {
    pub on_order_settled: Option<EventHandler<OrderSettledEvent>>,
    pub on_transfer_pending: Option<EventHandler<TransferPendingEvent>>,
    pub on_transfer_confirmed: Option<EventHandler<TransferConfirmedEvent>>,
    pub on_transfer_rejected: Option<EventHandler<TransferRejectedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_settled = hooks.on_order_settled.map(|f| EventHandler::new(buffer_size, f));
        let on_transfer_pending = hooks.on_transfer_pending.map(|f| EventHandler::new(buffer_size, f));
        let on_transfer_confirmed = hooks.on_transfer_confirmed.map(|f| EventHandler::new(buffer_size, f));
        let on_transfer_rejected = hooks.on_transfer_rejected.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_settled, on_transfer_pending, on_transfer_confirmed, on_transfer_rejected }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_settled {
            result.order_settled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_transfer_pending {
            result.transfer_pending_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_transfer_confirmed {
            result.transfer_confirmed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_transfer_rejected {
            result.transfer_rejected_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_settled {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_transfer_pending {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_transfer_confirmed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_transfer_rejected {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_settled: Option<Handler<OrderSettledEvent>>,
    pub on_transfer_pending: Option<Handler<TransferPendingEvent>>,
    pub on_transfer_confirmed: Option<Handler<TransferConfirmedEvent>>,
    pub on_transfer_rejected: Option<Handler<TransferRejectedEvent>>,
}

impl EventHooks {
    pub fn on_order_settled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderSettledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_settled = Some(Arc::new(f));
        self
    }

    pub fn on_transfer_pending<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransferPendingEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_transfer_pending = Some(Arc::new(f));
        self
    }

    pub fn on_transfer_confirmed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransferConfirmedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_transfer_confirmed = Some(Arc::new(f));
        self
    }

    pub fn on_transfer_rejected<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransferRejectedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_transfer_rejected = Some(Arc::new(f));
        self
    }
}
