pub mod cycle;
pub mod drain;
pub mod enqueue;
pub mod unsubscribe;
