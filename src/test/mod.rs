mod allocator;
mod dgs_codec;
mod memory_controller;
