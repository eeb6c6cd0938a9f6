pub mod structuring; // Structured event extraction from model output
