pub mod admin;
pub mod auth;
pub mod catalog;
pub mod display;
pub mod scan;

pub use admin::{AdminStats, AdminUser, PaginatedUsers, UpdateUserRoleRequest};
pub use auth::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RefreshRequest, RefreshedTokens,
    RegisterRequest, Role, UpdateProfileRequest, User,
};
pub use catalog::{
    CompareRequest, CompareResponse, Correction, CorrectionStatus, CreateCorrectionRequest,
    NutrientComparison, Product, ProductNutrients, ProductSummary, Winner,
};
pub use display::Tone;
pub use scan::{
    HighlightLevel, Insight, InsightType, NutriScore, NutrientField, NutrientHighlight, Nutrients,
    PaginatedScans, Scan, ScanImage, ScanStatus,
};
