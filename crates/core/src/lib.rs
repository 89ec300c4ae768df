pub mod shared {
    pub mod config;
    pub mod constants;
    pub mod error;
    pub mod event;
    pub mod frame;
    pub mod rect;
    pub mod video_metadata;
}

pub mod recognition {
    pub mod domain {
        pub mod detection;
        pub mod face_database;
        pub mod known_face;
        pub mod recognizer;
    }
}

pub mod detection {
    pub mod domain {
        pub mod detection_engine;
        pub mod face_detector;
        pub mod face_embedder;
        pub mod model_provider;
    }
    pub mod infrastructure;
}

pub mod tracking {
    pub mod domain {
        pub mod face_tracker;
        pub mod id_mapper;
        pub mod multi_object_tracker;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod face_pipeline;
    pub mod pipeline_logger;
}

pub mod video {
    pub mod domain {
        pub mod video_reader;
    }
    pub mod infrastructure {
        pub mod ffmpeg_reader;
        pub mod image_sequence_reader;
    }
}
