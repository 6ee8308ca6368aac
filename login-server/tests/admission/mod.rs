mod queue;
mod window;
