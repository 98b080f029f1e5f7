pub const DEFAULT_PASSWORD: &str = "Test1234!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestAccount {
    pub role: String,
    pub email: String,
    pub display_name: String,
}

impl TestAccount {
    pub fn new(role: &str, email: &str, display_name: &str) -> Self {
        Self {
            role: role.to_string(),
            email: email.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// One account per application role.
pub fn default_roster() -> Vec<TestAccount> {
    [
        ("super_admin", "superadmin@test.com", "Super Admin"),
        ("mmda_admin", "mmdaadmin@test.com", "MMDA Admin"),
        ("finance", "finance@test.com", "Finance Officer"),
        ("collector", "collector@test.com", "Collector"),
        ("auditor", "auditor@test.com", "Auditor"),
        ("business_owner", "businessowner@test.com", "Business Owner"),
        ("monitoring_body", "monitoring@test.com", "Monitoring Body"),
        (
            "business_registration_officer",
            "registrationofficer@test.com",
            "Registration Officer",
        ),
        ("regional_admin", "regionaladmin@test.com", "Regional Admin"),
    ]
    .into_iter()
    .map(|(role, email, name)| TestAccount::new(role, email, name))
    .collect()
}
