//! 认证错误提示

/// 未知错误码的兜底提示
pub const DEFAULT_AUTH_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

const AUTH_ERROR_MESSAGES: &[(&str, &str)] = &[
    ("auth/email-already-in-use", "This email is already registered. Please sign in instead."),
    ("auth/invalid-email", "Invalid email address format."),
    ("auth/weak-password", "Password should be at least 6 characters."),
    ("auth/user-not-found", "No account found with this email."),
    ("auth/wrong-password", "Incorrect password. Please try again."),
    ("auth/too-many-requests", "Too many failed attempts. Please try again later."),
    ("auth/network-request-failed", "Network error. Please check your internet connection."),
    ("auth/invalid-credential", "Invalid email or password."),
    ("auth/user-disabled", "This account has been disabled."),
    ("auth/missing-password", "Please enter your password."),
];

/// 把身份服务错误码映射为用户提示
pub fn auth_error_message(code: &str) -> &'static str {
    AUTH_ERROR_MESSAGES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, message)| *message)
        .unwrap_or(DEFAULT_AUTH_ERROR_MESSAGE)
}
