#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use keyshare_crypto::{CryptoCapability, CryptoError, EciesCrypto, KeyPairHex, Zeroizing};
use keyshare_sync::{DirectoryClient, DirectoryError, IdentityError, LocalIdentity};
use keyshare_types::{
    DeviceEntry, DeviceId, EncryptedKeyGrant, MemberEntry, OrganizationId, OrganizationRecord,
    SessionToken, UserId, UserRecord,
};

// -- Push log --

#[derive(Debug, Clone, PartialEq)]
pub enum Push {
    RegisterDevice { public_key: String, ciphertext: String },
    DeviceGrant { device_id: DeviceId, grant: EncryptedKeyGrant },
    Bootstrap { org_id: OrganizationId, public_key: String, ciphertext: String },
    UserPublicKey { public_key: String },
    OrgGrant { org_id: OrganizationId, member_id: UserId, grant: EncryptedKeyGrant },
}

impl Push {
    /// Every string that went over the wire with this push.
    pub fn payload(&self) -> Vec<&str> {
        match self {
            Push::RegisterDevice { public_key, ciphertext } => vec![public_key.as_str(), ciphertext.as_str()],
            Push::DeviceGrant { device_id, grant } => {
                vec![device_id.as_str(), grant.recipient_public_key.as_str(), grant.ciphertext.as_str()]
            }
            Push::Bootstrap { org_id, public_key, ciphertext } => {
                vec![org_id.as_str(), public_key.as_str(), ciphertext.as_str()]
            }
            Push::UserPublicKey { public_key } => vec![public_key.as_str()],
            Push::OrgGrant { org_id, member_id, grant } => vec![
                org_id.as_str(),
                member_id.as_str(),
                grant.recipient_public_key.as_str(),
                grant.ciphertext.as_str(),
            ],
        }
    }
}

// -- In-memory directory --

struct UserState {
    id: UserId,
    username: String,
    public_key: Option<String>,
    emergency_kit_generated_at: Option<DateTime<Utc>>,
}

struct DeviceState {
    id: DeviceId,
    owner: UserId,
    public_key: Option<String>,
    user_key_encrypted: Option<String>,
}

struct OrgState {
    id: OrganizationId,
    slug: String,
    public_key: Option<String>,
    members: Vec<UserId>,
    grants: HashMap<UserId, String>,
}

#[derive(Default)]
struct State {
    users: Vec<UserState>,
    devices: Vec<DeviceState>,
    orgs: Vec<OrgState>,
    tokens: HashMap<String, UserId>,
    pushes: Vec<Push>,
    fetches: usize,
    next_device: usize,
    ignore_registrations: bool,
    /// Organization key and grants another client lands right after our next fetch.
    racing_bootstraps: HashMap<OrganizationId, (String, Vec<(UserId, String)>)>,
}

/// Directory fake with the same read-your-writes contract as the real one.
/// Bootstrap is compare-and-swap: a second bootstrap of the same
/// organization is rejected with 409.
#[derive(Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, id: &str, username: &str, token: &str, public_key: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state.users.push(UserState {
            id: id.into(),
            username: username.to_string(),
            public_key: public_key.map(str::to_string),
            emergency_kit_generated_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        });
        state.tokens.insert(token.to_string(), id.into());
    }

    pub fn add_device(&self, id: &str, owner: &str, public_key: Option<&str>, user_key_encrypted: Option<String>) {
        self.state.lock().unwrap().devices.push(DeviceState {
            id: id.into(),
            owner: owner.into(),
            public_key: public_key.map(str::to_string),
            user_key_encrypted,
        });
    }

    pub fn add_org(&self, id: &str, slug: &str, members: &[&str]) {
        self.state.lock().unwrap().orgs.push(OrgState {
            id: id.into(),
            slug: slug.to_string(),
            public_key: None,
            members: members.iter().map(|m| UserId::from(*m)).collect(),
            grants: HashMap::new(),
        });
    }

    pub fn set_org_public_key(&self, org_id: &str, public_key: &str) {
        let mut state = self.state.lock().unwrap();
        let org = org_mut(&mut state, &org_id.into()).unwrap();
        org.public_key = Some(public_key.to_string());
    }

    pub fn set_org_grant(&self, org_id: &str, member: &str, ciphertext: &str) {
        let mut state = self.state.lock().unwrap();
        let org = org_mut(&mut state, &org_id.into()).unwrap();
        org.grants.insert(member.into(), ciphertext.to_string());
    }

    pub fn set_user_public_key(&self, user_id: &str, public_key: &str) {
        let mut state = self.state.lock().unwrap();
        let user = state.users.iter_mut().find(|u| u.id.as_str() == user_id).unwrap();
        user.public_key = Some(public_key.to_string());
    }

    /// Another client bootstraps `org_id` (and grants `grants`) just after
    /// our next fetch of it, so our own bootstrap arrives second.
    pub fn bootstrap_after_next_fetch(&self, org_id: &str, public_key: &str, grants: &[(&str, String)]) {
        let grants = grants.iter().map(|(m, c)| (UserId::from(*m), c.clone())).collect();
        self.state
            .lock()
            .unwrap()
            .racing_bootstraps
            .insert(org_id.into(), (public_key.to_string(), grants));
    }

    pub fn ignore_registrations(&self) {
        self.state.lock().unwrap().ignore_registrations = true;
    }

    pub fn pushes(&self) -> Vec<Push> {
        self.state.lock().unwrap().pushes.clone()
    }

    pub fn fetches(&self) -> usize {
        self.state.lock().unwrap().fetches
    }

    pub fn clear_pushes(&self) {
        self.state.lock().unwrap().pushes.clear();
    }

    pub fn org_public_key(&self, org_id: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.orgs.iter().find(|o| o.id.as_str() == org_id).and_then(|o| o.public_key.clone())
    }

    pub fn org_grant(&self, org_id: &str, member: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .orgs
            .iter()
            .find(|o| o.id.as_str() == org_id)
            .and_then(|o| o.grants.get(&UserId::from(member)).cloned())
    }

    pub fn device_grant(&self, device_id: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .devices
            .iter()
            .find(|d| d.id.as_str() == device_id)
            .and_then(|d| d.user_key_encrypted.clone())
    }
}

fn caller(state: &State, token: &SessionToken) -> Result<UserId, DirectoryError> {
    state.tokens.get(token.expose()).cloned().ok_or(DirectoryError::Unauthorized)
}

fn org_mut<'a>(state: &'a mut State, org_id: &OrganizationId) -> Result<&'a mut OrgState, DirectoryError> {
    state
        .orgs
        .iter_mut()
        .find(|o| &o.id == org_id)
        .ok_or_else(|| DirectoryError::NotFound(format!("organization {}", org_id)))
}

fn rejected(status: u16, body: &str) -> DirectoryError {
    DirectoryError::Status { status, body: body.to_string() }
}

fn user_record(state: &State, user_id: &UserId) -> Result<UserRecord, DirectoryError> {
    let user = state
        .users
        .iter()
        .find(|u| &u.id == user_id)
        .ok_or_else(|| DirectoryError::NotFound(format!("user {}", user_id)))?;

    Ok(UserRecord {
        id: user.id.clone(),
        username: user.username.clone(),
        public_key: user.public_key.clone(),
        emergency_kit_generated_at: user.emergency_kit_generated_at,
        devices: state
            .devices
            .iter()
            .filter(|d| &d.owner == user_id)
            .map(|d| DeviceEntry {
                id: d.id.clone(),
                public_key: d.public_key.clone(),
                user_key_granted: d.user_key_encrypted.is_some(),
            })
            .collect(),
        organization_ids: state
            .orgs
            .iter()
            .filter(|o| o.members.contains(user_id))
            .map(|o| o.id.clone())
            .collect(),
    })
}

fn org_record(state: &State, org_id: &OrganizationId, viewer: &UserId) -> Result<OrganizationRecord, DirectoryError> {
    let org = state
        .orgs
        .iter()
        .find(|o| &o.id == org_id && o.members.contains(viewer))
        .ok_or_else(|| DirectoryError::NotFound(format!("organization {}", org_id)))?;

    let members = org
        .members
        .iter()
        .map(|member_id| {
            let user = state.users.iter().find(|u| &u.id == member_id);
            MemberEntry {
                user_id: member_id.clone(),
                username: user.map(|u| u.username.clone()).unwrap_or_default(),
                public_key: user.and_then(|u| u.public_key.clone()),
                org_key_granted: org.grants.contains_key(member_id),
            }
        })
        .collect();

    Ok(OrganizationRecord {
        id: org.id.clone(),
        slug: org.slug.clone(),
        public_key: org.public_key.clone(),
        private_key_encrypted: org.grants.get(viewer).cloned(),
        members,
    })
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn fetch_user(&self, token: &SessionToken) -> Result<UserRecord, DirectoryError> {
        let mut state = self.state.lock().unwrap();
        state.fetches += 1;
        let me = caller(&state, token)?;
        user_record(&state, &me)
    }

    async fn register_device(
        &self,
        token: &SessionToken,
        device_public_key: &str,
        user_private_key_encrypted: &str,
    ) -> Result<UserRecord, DirectoryError> {
        let mut state = self.state.lock().unwrap();
        let me = caller(&state, token)?;
        state.pushes.push(Push::RegisterDevice {
            public_key: device_public_key.to_string(),
            ciphertext: user_private_key_encrypted.to_string(),
        });

        if !state.ignore_registrations {
            state.next_device += 1;
            let id = DeviceId::new(format!("registered-{}", state.next_device));
            state.devices.push(DeviceState {
                id,
                owner: me.clone(),
                public_key: Some(device_public_key.to_string()),
                user_key_encrypted: Some(user_private_key_encrypted.to_string()),
            });
        }
        user_record(&state, &me)
    }

    async fn fetch_device_public_key(
        &self,
        token: &SessionToken,
        device_id: &DeviceId,
    ) -> Result<Option<String>, DirectoryError> {
        let mut state = self.state.lock().unwrap();
        state.fetches += 1;
        caller(&state, token)?;
        let device = state
            .devices
            .iter()
            .find(|d| &d.id == device_id)
            .ok_or_else(|| DirectoryError::NotFound(format!("device {}", device_id)))?;
        Ok(device.public_key.clone())
    }

    async fn push_device_key_grant(
        &self,
        token: &SessionToken,
        device_id: &DeviceId,
        grant: &EncryptedKeyGrant,
    ) -> Result<UserRecord, DirectoryError> {
        let mut state = self.state.lock().unwrap();
        let me = caller(&state, token)?;
        state.pushes.push(Push::DeviceGrant { device_id: device_id.clone(), grant: grant.clone() });

        let device = state
            .devices
            .iter_mut()
            .find(|d| &d.id == device_id && d.owner == me)
            .ok_or_else(|| DirectoryError::NotFound(format!("device {}", device_id)))?;
        if device.public_key.as_deref() != Some(grant.recipient_public_key.as_str()) {
            return Err(rejected(422, "grant addressed to a different public key"));
        }
        device.user_key_encrypted = Some(grant.ciphertext.clone());
        user_record(&state, &me)
    }

    async fn fetch_organization(
        &self,
        token: &SessionToken,
        org_id: &OrganizationId,
    ) -> Result<OrganizationRecord, DirectoryError> {
        let mut state = self.state.lock().unwrap();
        state.fetches += 1;
        let me = caller(&state, token)?;
        let record = org_record(&state, org_id, &me)?;

        if let Some((public_key, grants)) = state.racing_bootstraps.remove(org_id) {
            let org = org_mut(&mut state, org_id)?;
            org.public_key = Some(public_key);
            org.grants.extend(grants);
        }
        Ok(record)
    }

    async fn push_organization_bootstrap(
        &self,
        token: &SessionToken,
        org_id: &OrganizationId,
        public_key: &str,
        private_key_encrypted: &str,
    ) -> Result<OrganizationRecord, DirectoryError> {
        let mut state = self.state.lock().unwrap();
        let me = caller(&state, token)?;
        state.pushes.push(Push::Bootstrap {
            org_id: org_id.clone(),
            public_key: public_key.to_string(),
            ciphertext: private_key_encrypted.to_string(),
        });

        let org = org_mut(&mut state, org_id)?;
        if org.public_key.is_some() {
            return Err(rejected(409, "organization already bootstrapped"));
        }
        org.public_key = Some(public_key.to_string());
        org.grants.insert(me.clone(), private_key_encrypted.to_string());
        org_record(&state, org_id, &me)
    }

    async fn push_organization_user_public_key(
        &self,
        token: &SessionToken,
        public_key: &str,
    ) -> Result<UserRecord, DirectoryError> {
        let mut state = self.state.lock().unwrap();
        let me = caller(&state, token)?;
        state.pushes.push(Push::UserPublicKey { public_key: public_key.to_string() });

        if let Some(user) = state.users.iter_mut().find(|u| u.id == me) {
            user.public_key = Some(public_key.to_string());
        }
        user_record(&state, &me)
    }

    async fn push_org_key_grant(
        &self,
        token: &SessionToken,
        org_id: &OrganizationId,
        member_id: &UserId,
        grant: &EncryptedKeyGrant,
    ) -> Result<OrganizationRecord, DirectoryError> {
        let mut state = self.state.lock().unwrap();
        let me = caller(&state, token)?;
        state.pushes.push(Push::OrgGrant {
            org_id: org_id.clone(),
            member_id: member_id.clone(),
            grant: grant.clone(),
        });

        let member_key = state
            .users
            .iter()
            .find(|u| &u.id == member_id)
            .and_then(|u| u.public_key.clone());
        if member_key.as_deref() != Some(grant.recipient_public_key.as_str()) {
            return Err(rejected(422, "grant addressed to a different public key"));
        }

        let org = org_mut(&mut state, org_id)?;
        if !org.members.contains(member_id) {
            return Err(rejected(422, "not a member"));
        }
        org.grants.insert(member_id.clone(), grant.ciphertext.clone());
        org_record(&state, org_id, &me)
    }
}

// -- Local identity --

pub struct MemoryIdentity {
    token: Option<SessionToken>,
    device: Option<KeyPairHex>,
    user: Option<KeyPairHex>,
    selection: Mutex<Option<OrganizationId>>,
}

impl MemoryIdentity {
    pub fn new(token: Option<&str>, device: Option<KeyPairHex>, user: Option<KeyPairHex>) -> Self {
        Self {
            token: token.map(SessionToken::new),
            device,
            user,
            selection: Mutex::new(None),
        }
    }

    pub fn with_selection(self, org_id: &str) -> Self {
        *self.selection.lock().unwrap() = Some(org_id.into());
        self
    }

    pub fn selected(&self) -> Option<OrganizationId> {
        self.selection.lock().unwrap().clone()
    }
}

impl LocalIdentity for MemoryIdentity {
    fn current_token(&self) -> Result<SessionToken, IdentityError> {
        self.token.clone().ok_or(IdentityError::NotAuthenticated)
    }

    fn current_organization_selection(&self) -> Result<Option<OrganizationId>, IdentityError> {
        Ok(self.selected())
    }

    fn select_organization(&self, org_id: &OrganizationId) -> Result<(), IdentityError> {
        *self.selection.lock().unwrap() = Some(org_id.clone());
        Ok(())
    }

    fn device_keys(&self) -> Result<KeyPairHex, IdentityError> {
        self.device.clone().ok_or(IdentityError::MissingDeviceKeys)
    }

    fn user_keys(&self) -> Result<KeyPairHex, IdentityError> {
        self.user.clone().ok_or(IdentityError::MissingUserKeys)
    }
}

// -- Crypto --

/// ECIES crypto that counts keypair generations.
#[derive(Default)]
pub struct CountingCrypto {
    inner: EciesCrypto,
    generated: AtomicUsize,
}

impl CountingCrypto {
    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }
}

impl CryptoCapability for CountingCrypto {
    fn generate_keypair(&self) -> KeyPairHex {
        self.generated.fetch_add(1, Ordering::SeqCst);
        self.inner.generate_keypair()
    }

    fn encrypt(&self, plaintext: &[u8], recipient_public_key: &str) -> Result<String, CryptoError> {
        self.inner.encrypt(plaintext, recipient_public_key)
    }

    fn decrypt(&self, ciphertext: &str, private_key: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        self.inner.decrypt(ciphertext, private_key)
    }

    fn public_key_for(&self, private_key: &str) -> Result<String, CryptoError> {
        self.inner.public_key_for(private_key)
    }
}

// -- Fixtures --

/// A directory user together with the secrets only their machine holds.
pub struct Account {
    pub id: String,
    pub username: String,
    pub token: String,
    pub user_keys: KeyPairHex,
    pub device_keys: KeyPairHex,
}

impl Account {
    pub fn new(id: &str, username: &str) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            token: format!("token-{}", id),
            user_keys: EciesCrypto.generate_keypair(),
            device_keys: EciesCrypto.generate_keypair(),
        }
    }

    pub fn identity(&self) -> MemoryIdentity {
        MemoryIdentity::new(
            Some(self.token.as_str()),
            Some(self.device_keys.clone()),
            Some(self.user_keys.clone()),
        )
    }

    /// Register the account and its current device as already synced.
    pub fn enroll(&self, dir: &InMemoryDirectory, publish_public_key: bool) {
        let public_key = publish_public_key.then_some(self.user_keys.public_key.as_str());
        dir.add_user(&self.id, &self.username, &self.token, public_key);
        let granted = seal(&self.user_keys.private_key, &self.device_keys.public_key);
        dir.add_device(
            &format!("{}-laptop", self.id),
            &self.id,
            Some(self.device_keys.public_key.as_str()),
            Some(granted),
        );
    }
}

pub fn seal(plaintext: &str, public_key: &str) -> String {
    EciesCrypto.encrypt(plaintext.as_bytes(), public_key).unwrap()
}

pub fn open(ciphertext: &str, private_key: &str) -> Option<String> {
    EciesCrypto
        .decrypt(ciphertext, private_key)
        .ok()
        .map(|raw| String::from_utf8(raw.to_vec()).unwrap())
}
