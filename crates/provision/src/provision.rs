use crate::client::{AuthAdmin, AuthUser, NewAuthUser, Profile};
use crate::error::{ProvisionError, ProvisionStage};
use crate::roster::TestAccount;

/// What already exists for an account before anything is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountState {
    Missing,
    AuthOnly { user: AuthUser },
    Provisioned { user: AuthUser },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAccount {
    pub account: TestAccount,
    pub state: Result<AccountState, ProvisionError>,
}

impl PlannedAccount {
    pub fn needs_work(&self) -> bool {
        !matches!(self.state, Ok(AccountState::Provisioned { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    Created { user_id: String },
    ProfileMirrored { user_id: String },
    AlreadyProvisioned { user_id: String },
    Failed {
        stage: ProvisionStage,
        error: ProvisionError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProvisionReport {
    pub outcomes: Vec<(TestAccount, AccountOutcome)>,
}

impl ProvisionReport {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::Created { .. }))
    }

    pub fn mirrored(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::ProfileMirrored { .. }))
    }

    pub fn already_provisioned(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::AlreadyProvisioned { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&AccountOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Looks up every account without changing anything. A lookup error is kept
/// in that account's entry; the others are still checked.
pub async fn plan_accounts(client: &dyn AuthAdmin, roster: &[TestAccount]) -> Vec<PlannedAccount> {
    let mut planned = Vec::with_capacity(roster.len());
    for account in roster {
        let state = lookup(client, account).await;
        if let Err(e) = &state {
            tracing::warn!(email = %account.email, error = %e, "account lookup failed");
        }
        planned.push(PlannedAccount {
            account: account.clone(),
            state,
        });
    }
    planned
}

async fn lookup(client: &dyn AuthAdmin, account: &TestAccount) -> Result<AccountState, ProvisionError> {
    let Some(user) = client.find_user_by_email(&account.email).await? else {
        return Ok(AccountState::Missing);
    };

    if client.profile_exists(&user.id).await? {
        Ok(AccountState::Provisioned { user })
    } else {
        Ok(AccountState::AuthOnly { user })
    }
}

/// Brings every planned account to the provisioned state. Accounts are
/// independent: a failure is recorded and the next account is processed.
pub async fn apply_plan(
    client: &dyn AuthAdmin,
    plan: &[PlannedAccount],
    password: &str,
) -> ProvisionReport {
    let mut report = ProvisionReport::default();
    for entry in plan {
        let outcome = apply_one(client, entry, password).await;
        match &outcome {
            AccountOutcome::Failed { stage, error } => {
                tracing::warn!(email = %entry.account.email, %stage, %error, "provisioning failed");
            }
            _ => tracing::info!(email = %entry.account.email, role = %entry.account.role, "account ready"),
        }
        report.outcomes.push((entry.account.clone(), outcome));
    }
    report
}

async fn apply_one(client: &dyn AuthAdmin, entry: &PlannedAccount, password: &str) -> AccountOutcome {
    let account = &entry.account;
    let state = match &entry.state {
        Ok(state) => state,
        Err(error) => {
            return AccountOutcome::Failed {
                stage: ProvisionStage::Lookup,
                error: error.clone(),
            }
        }
    };

    match state {
        AccountState::Provisioned { user } => AccountOutcome::AlreadyProvisioned {
            user_id: user.id.clone(),
        },
        AccountState::AuthOnly { user } => match insert_profile(client, account, user).await {
            Ok(()) => AccountOutcome::ProfileMirrored {
                user_id: user.id.clone(),
            },
            Err(error) => AccountOutcome::Failed {
                stage: ProvisionStage::InsertProfile,
                error,
            },
        },
        AccountState::Missing => {
            let request = NewAuthUser {
                email: account.email.clone(),
                password: password.to_string(),
                role: account.role.clone(),
                display_name: account.display_name.clone(),
            };

            let user = match client.create_user(&request).await {
                Ok(user) => user,
                Err(error) => {
                    return AccountOutcome::Failed {
                        stage: ProvisionStage::CreateAuthUser,
                        error,
                    }
                }
            };

            match insert_profile(client, account, &user).await {
                Ok(()) => AccountOutcome::Created { user_id: user.id },
                Err(error) => AccountOutcome::Failed {
                    stage: ProvisionStage::InsertProfile,
                    error,
                },
            }
        }
    }
}

async fn insert_profile(
    client: &dyn AuthAdmin,
    account: &TestAccount,
    user: &AuthUser,
) -> Result<(), ProvisionError> {
    let profile = Profile {
        id: user.id.clone(),
        email: account.email.clone(),
        name: account.display_name.clone(),
        role: account.role.clone(),
    };
    client.insert_profile(&profile).await
}

#[cfg(test)]
mod tests {
    use super::{apply_plan, plan_accounts, AccountOutcome, AccountState};
    use crate::client::{AuthAdmin, AuthUser, NewAuthUser, Profile};
    use crate::error::{ProvisionError, ProvisionStage};
    use crate::roster::{TestAccount, DEFAULT_PASSWORD};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeAdmin {
        users: Mutex<Vec<AuthUser>>,
        profiles: Mutex<Vec<Profile>>,
        created: Mutex<Vec<NewAuthUser>>,
        reject_create: HashSet<String>,
        reject_lookup: HashSet<String>,
    }

    impl FakeAdmin {
        fn with_user(self, id: &str, email: &str) -> Self {
            self.users.lock().unwrap().push(AuthUser {
                id: id.to_string(),
                email: email.to_string(),
            });
            self
        }

        fn with_profile(self, id: &str, email: &str) -> Self {
            self.profiles.lock().unwrap().push(Profile {
                id: id.to_string(),
                email: email.to_string(),
                name: String::new(),
                role: String::new(),
            });
            self
        }
    }

    #[async_trait]
    impl AuthAdmin for FakeAdmin {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, ProvisionError> {
            if self.reject_lookup.contains(email) {
                return Err(ProvisionError::Http {
                    operation: "list_users".to_string(),
                    message: "connection refused".to_string(),
                });
            }
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn create_user(&self, user: &NewAuthUser) -> Result<AuthUser, ProvisionError> {
            if self.reject_create.contains(&user.email) {
                return Err(ProvisionError::Status {
                    operation: "create_user".to_string(),
                    status: 422,
                    body: "{\"msg\":\"weak password\"}".to_string(),
                });
            }
            self.created.lock().unwrap().push(user.clone());
            let mut users = self.users.lock().unwrap();
            let created = AuthUser {
                id: format!("id-{}", users.len() + 1),
                email: user.email.clone(),
            };
            users.push(created.clone());
            Ok(created)
        }

        async fn profile_exists(&self, user_id: &str) -> Result<bool, ProvisionError> {
            Ok(self.profiles.lock().unwrap().iter().any(|p| p.id == user_id))
        }

        async fn insert_profile(&self, profile: &Profile) -> Result<(), ProvisionError> {
            self.profiles.lock().unwrap().push(profile.clone());
            Ok(())
        }
    }

    fn roster() -> Vec<TestAccount> {
        vec![
            TestAccount::new("finance", "finance@test.com", "Finance Officer"),
            TestAccount::new("auditor", "auditor@test.com", "Auditor"),
            TestAccount::new("collector", "collector@test.com", "Collector"),
        ]
    }

    #[tokio::test]
    async fn plan_classifies_existing_accounts() {
        let admin = FakeAdmin::default()
            .with_user("u1", "finance@test.com")
            .with_profile("u1", "finance@test.com")
            .with_user("u2", "auditor@test.com");

        let plan = plan_accounts(&admin, &roster()).await;

        assert!(matches!(plan[0].state, Ok(AccountState::Provisioned { .. })));
        assert!(matches!(plan[1].state, Ok(AccountState::AuthOnly { .. })));
        assert_eq!(plan[2].state, Ok(AccountState::Missing));
        assert!(!plan[0].needs_work());
        assert!(plan[1].needs_work());
        assert!(admin.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn apply_creates_missing_and_mirrors_partial_accounts() {
        let admin = FakeAdmin::default()
            .with_user("u1", "finance@test.com")
            .with_profile("u1", "finance@test.com")
            .with_user("u2", "auditor@test.com");

        let plan = plan_accounts(&admin, &roster()).await;
        let report = apply_plan(&admin, &plan, DEFAULT_PASSWORD).await;

        assert_eq!(report.already_provisioned(), 1);
        assert_eq!(report.mirrored(), 1);
        assert_eq!(report.created(), 1);
        assert_eq!(report.failed(), 0);

        let created = admin.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].email, "collector@test.com");
        assert_eq!(created[0].role, "collector");
        assert_eq!(created[0].password, DEFAULT_PASSWORD);

        let profiles = admin.profiles.lock().unwrap();
        let collector = profiles
            .iter()
            .find(|p| p.email == "collector@test.com")
            .unwrap();
        assert_eq!(collector.name, "Collector");
        assert_eq!(collector.role, "collector");
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_others() {
        let mut admin = FakeAdmin::default();
        admin.reject_create.insert("finance@test.com".to_string());
        admin.reject_lookup.insert("auditor@test.com".to_string());

        let plan = plan_accounts(&admin, &roster()).await;
        let report = apply_plan(&admin, &plan, DEFAULT_PASSWORD).await;

        assert_eq!(report.failed(), 2);
        assert_eq!(report.created(), 1);
        assert!(matches!(
            report.outcomes[0].1,
            AccountOutcome::Failed {
                stage: ProvisionStage::CreateAuthUser,
                ..
            }
        ));
        assert!(matches!(
            report.outcomes[1].1,
            AccountOutcome::Failed {
                stage: ProvisionStage::Lookup,
                ..
            }
        ));
        assert!(matches!(report.outcomes[2].1, AccountOutcome::Created { .. }));
    }

    #[tokio::test]
    async fn rerun_after_success_changes_nothing() {
        let admin = FakeAdmin::default();

        let plan = plan_accounts(&admin, &roster()).await;
        apply_plan(&admin, &plan, DEFAULT_PASSWORD).await;

        let again = plan_accounts(&admin, &roster()).await;
        assert!(again.iter().all(|p| !p.needs_work()));

        let report = apply_plan(&admin, &again, DEFAULT_PASSWORD).await;
        assert_eq!(report.already_provisioned(), 3);
        assert_eq!(admin.created.lock().unwrap().len(), 3);
    }
}
