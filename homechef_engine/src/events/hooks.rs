use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderDeliveredEvent, OrderRejectedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_delivered_producer: Vec<EventProducer<OrderDeliveredEvent>>,
    pub order_rejected_producer: Vec<EventProducer<OrderRejectedEvent>>,
}

pub struct EventHandlers {
    pub on_order_delivered: Option<EventHandler<OrderDeliveredEvent>>,
    pub on_order_rejected: Option<EventHandler<OrderRejectedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_delivered = hooks.on_order_delivered.map(|f| EventHandler::new(buffer_size, f));
        let on_order_rejected = hooks.on_order_rejected.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_delivered, on_order_rejected }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_delivered {
            result.order_delivered_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_rejected {
            result.order_rejected_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_delivered {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_rejected {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_delivered: Option<Handler<OrderDeliveredEvent>>,
    pub on_order_rejected: Option<Handler<OrderRejectedEvent>>,
}

impl EventHooks {
    pub fn on_order_delivered<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderDeliveredEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_delivered = Some(Arc::new(f));
        self
    }

    pub fn on_order_rejected<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderRejectedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_rejected = Some(Arc::new(f));
        self
    }
}
