pub mod health;
pub mod manual_tasks;
pub mod pipeline;
