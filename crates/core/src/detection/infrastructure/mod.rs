pub mod blob;
pub mod execution_provider;
pub mod onnx_face_detector;
pub mod onnx_face_embedder;
pub mod onnx_model_provider;
