pub mod dma;
pub mod interrupt_control;
pub mod keypad;
pub mod lcd;
pub mod sound;
pub mod timers;
