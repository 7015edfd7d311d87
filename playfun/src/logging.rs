use std::{
    backtrace::Backtrace,
    fmt,
    panic::{self, PanicInfo},
};

use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_log::LogTracer;
use tracing_subscriber::{layer::Context, layer::SubscriberExt, registry::LookupSpan, Layer};

/// Route `tracing` events, `log` records, and panics to stderr.
pub fn init() {
    panic::set_hook(Box::new(panic_hook));
    LogTracer::init().unwrap();
    tracing::subscriber::set_global_default(tracing_subscriber::Registry::default().with(LogLayer))
        .unwrap();
}

fn log_callback(level: Level, message: &str) {
    if level <= Level::INFO {
        let timestamp = chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S%.3f")
            .to_string();
        eprintln!("[{}] [{}] {}", timestamp, level, message);
    }
}

fn panic_hook(info: &PanicInfo<'_>) {
    let location = info.location().unwrap();
    let msg = match info.payload().downcast_ref::<&'static str>() {
        Some(s) => *s,
        None => match info.payload().downcast_ref::<String>() {
            Some(s) => &s[..],
            None => "Box<Any>",
        },
    };
    let backtrace = Backtrace::force_capture();
    tracing::error!("Panicked at {}: {}\n{}", location, msg, backtrace);
}

struct LogLayer;

#[derive(Default)]
struct MessageVisitor {
    message: String,
    log_target: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "log.target" {
            self.log_target = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
}

impl<S> Layer<S> for LogLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        let target = visitor
            .log_target
            .unwrap_or_else(|| metadata.target().to_string());

        let message = format!("[{}] {}", target, visitor.message);
        log_callback(*metadata.level(), &message);
    }
}
