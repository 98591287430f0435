mod analytics;
mod lifecycle;
mod secrets;
mod tasks;
