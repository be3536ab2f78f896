//! Node types shipped with compgraph

pub mod calendar;
pub mod date;
pub mod event;
pub mod log;

use std::sync::Arc;

use self::calendar::{BusinessCalendar, CustomCalendar};
use self::date::{DateSource, FixedDate, SystemDate};
use self::event::EventSenderFactory;
use self::log::{BasicLogProvider, LogProvider};
use crate::config::{FactoryEntry, NodeRegistry};

/// Locators of the built-in node types
pub mod locators {
    pub const BASIC_LOG_PROVIDER: &str = "compgraph::log::BasicLogProvider";
    pub const FIXED_DATE: &str = "compgraph::date::FixedDate";
    pub const SYSTEM_DATE: &str = "compgraph::date::SystemDate";
    pub const CUSTOM_CALENDAR: &str = "compgraph::calendar::CustomCalendar";
    pub const ALL_DAYS_CALENDAR: &str = "compgraph::calendar::AllDaysCalendar";
    pub const ALL_WEEK_DAYS_CALENDAR: &str = "compgraph::calendar::AllWeekDaysCalendar";
    pub const EVENT_SENDER_FACTORY: &str = "compgraph::event::EventSenderFactory";
}

/// Register every built-in node type with its capabilities
pub fn register_builtins(registry: &mut NodeRegistry) {
    registry
        .register(
            locators::BASIC_LOG_PROVIDER,
            FactoryEntry::<BasicLogProvider>::new().provides(|f| f as Arc<dyn LogProvider>),
        )
        .register(
            locators::FIXED_DATE,
            FactoryEntry::<FixedDate>::new().provides(|f| f as Arc<dyn DateSource>),
        )
        .register(
            locators::SYSTEM_DATE,
            FactoryEntry::<SystemDate>::new().provides(|f| f as Arc<dyn DateSource>),
        )
        .register(
            locators::CUSTOM_CALENDAR,
            FactoryEntry::<CustomCalendar>::new().provides(|f| f as Arc<dyn BusinessCalendar>),
        )
        .register(
            locators::ALL_DAYS_CALENDAR,
            FactoryEntry::<CustomCalendar>::new()
                .provides(|f| f as Arc<dyn BusinessCalendar>)
                .with_default("weekmask", "Mon Tue Wed Thu Fri Sat Sun"),
        )
        .register(
            locators::ALL_WEEK_DAYS_CALENDAR,
            FactoryEntry::<CustomCalendar>::new()
                .provides(|f| f as Arc<dyn BusinessCalendar>)
                .with_default("weekmask", "Mon Tue Wed Thu Fri"),
        )
        .register_type::<EventSenderFactory>(locators::EVENT_SENDER_FACTORY);
}
