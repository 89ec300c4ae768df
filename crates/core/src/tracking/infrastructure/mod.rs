pub mod bytetrack_tracker;
