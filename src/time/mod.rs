// Time handling: real, simulated and manual clocks
pub mod source;
