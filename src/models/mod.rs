pub mod invoice;
pub mod user;

pub use invoice::{
    CreateInvoiceRequest, DashboardStats, Invoice, InvoiceStatus, LineItem,
    MessageResponse, UpdateInvoiceRequest,
};
pub use user::{
    normalize_email, AuthResponse, LoginRequest, NewUser, ProfileChanges, RegisterRequest,
    UpdateProfileRequest, User, UserProfile,
};
