// Domain layer: event, occurrence and attendance values plus the ports the engine calls out through.

pub mod model;
pub mod ports;
