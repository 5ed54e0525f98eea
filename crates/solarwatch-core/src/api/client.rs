//! Typed facility API on top of the request pipeline.
//!
//! Each method builds one GraphQL operation, sends it through the pipeline
//! and decodes the named field of the response. Application errors come
//! back as `PipelineError::Application` for the caller to display.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::operation::{Operation, Upload};
use super::pipeline::RequestPipeline;
use super::PipelineError;
use crate::auth::{Session, SessionManager, TokenStore, UserProfile};
use crate::models::{AuthPayload, Facility, FacilitySummary};
use crate::navigation::NavigationPort;

// ============================================================================
// Documents
// ============================================================================

const FACILITY_FIELDS: &str = "_id name nominalPower userId solarData { timestamp active_power_kW energy_kWh }";

const LOGIN_USER: &str = "mutation LoginUser($loginUserInput: LoginUserInput!) { \
    login(loginUserInput: $loginUserInput) { user { _id name email } authToken } }";

const SIGNUP_USER: &str = "mutation SignupUser($signupInput: CreateUserInput!) { \
    signup(signupInput: $signupInput) { user { _id name email } authToken } }";

const GET_FACILITIES_BY_USER: &str =
    "query GetFacilitiesByUser { facilitiesByUser { _id name nominalPower } }";

const DELETE_FACILITY: &str = "mutation DeleteFacility($id: String!) { deleteFacility(id: $id) }";

fn get_facility_by_id() -> String {
    format!(
        "query GetFacilityById($id: String!) {{ facilityById(id: $id) {{ {} }} }}",
        FACILITY_FIELDS
    )
}

fn create_facility() -> String {
    format!(
        "mutation CreateFacility($input: CreateFacilityInput!) {{ createFacility(input: $input) {{ {} }} }}",
        FACILITY_FIELDS
    )
}

fn update_facility() -> String {
    format!(
        "mutation UpdateFacility($input: UpdateFacilityInput!) {{ updateFacility(input: $input) {{ {} }} }}",
        FACILITY_FIELDS
    )
}

/// Fields of a facility update. At least one must be set.
#[derive(Debug, Clone, Default)]
pub struct FacilityUpdate {
    pub name: Option<String>,
    pub nominal_power: Option<f64>,
    pub file: Option<Upload>,
}

impl FacilityUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.nominal_power.is_none() && self.file.is_none()
    }
}

/// API client for the solar facility backend.
/// Clone is cheap - the pipeline and store are shared.
#[derive(Clone)]
pub struct SolarApi {
    pipeline: Arc<RequestPipeline>,
    sessions: SessionManager,
}

impl SolarApi {
    pub fn new(
        pipeline: Arc<RequestPipeline>,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn NavigationPort>,
    ) -> Self {
        Self {
            pipeline,
            sessions: SessionManager::new(store, navigator),
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    // ===== Session =====

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, PipelineError> {
        let op = Operation::new("LoginUser", LOGIN_USER)
            .public()
            .variable("loginUserInput", json!({ "email": email, "password": password }));
        let payload: AuthPayload = self.pipeline.execute(op).await?.decode_field("login")?;
        self.start_session(payload)
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<UserProfile, PipelineError> {
        let op = Operation::new("SignupUser", SIGNUP_USER)
            .public()
            .variable(
                "signupInput",
                json!({ "name": name, "email": email, "password": password }),
            );
        let payload: AuthPayload = self.pipeline.execute(op).await?.decode_field("signup")?;
        self.start_session(payload)
    }

    fn start_session(&self, payload: AuthPayload) -> Result<UserProfile, PipelineError> {
        let session = payload.into_session();
        self.sessions.start(&session).map_err(PipelineError::Store)?;
        Ok(session.user().clone())
    }

    pub fn logout(&self) {
        self.sessions.logout();
    }

    /// The stored session, if any, expired or not
    pub fn current_session(&self) -> Result<Option<Session>, PipelineError> {
        self.sessions.current_session().map_err(PipelineError::Store)
    }

    /// Profile of the signed-in user, if any
    pub fn current_user(&self) -> Result<Option<UserProfile>, PipelineError> {
        self.sessions.current_user().map_err(PipelineError::Store)
    }

    // ===== Facilities =====

    pub async fn facilities(&self) -> Result<Vec<FacilitySummary>, PipelineError> {
        let op = Operation::new("GetFacilitiesByUser", GET_FACILITIES_BY_USER);
        self.pipeline.execute(op).await?.decode_field("facilitiesByUser")
    }

    pub async fn facility(&self, id: &str) -> Result<Facility, PipelineError> {
        let op = Operation::new("GetFacilityById", get_facility_by_id()).variable("id", id);
        self.pipeline.execute(op).await?.decode_field("facilityById")
    }

    pub async fn create_facility(
        &self,
        name: &str,
        nominal_power: f64,
        file: Option<Upload>,
    ) -> Result<Facility, PipelineError> {
        if name.trim().is_empty() {
            return Err(PipelineError::InvalidInput("facility name is required".to_string()));
        }
        let mut op = Operation::new("CreateFacility", create_facility()).variable(
            "input",
            json!({ "name": name, "nominalPower": nominal_power }),
        );
        if let Some(file) = file {
            op = op.attach("input.file", file);
        }
        self.pipeline.execute(op).await?.decode_field("createFacility")
    }

    pub async fn update_facility(&self, id: &str, update: FacilityUpdate) -> Result<Facility, PipelineError> {
        if update.is_empty() {
            return Err(PipelineError::InvalidInput(
                "at least one field must be filled".to_string(),
            ));
        }

        let mut input = Map::new();
        input.insert("id".to_string(), Value::from(id));
        if let Some(name) = update.name {
            input.insert("name".to_string(), Value::from(name));
        }
        if let Some(power) = update.nominal_power {
            input.insert("nominalPower".to_string(), Value::from(power));
        }

        let mut op = Operation::new("UpdateFacility", update_facility()).variable("input", input);
        if let Some(file) = update.file {
            op = op.attach("input.file", file);
        }
        self.pipeline.execute(op).await?.decode_field("updateFacility")
    }

    pub async fn delete_facility(&self, id: &str) -> Result<bool, PipelineError> {
        let op = Operation::new("DeleteFacility", DELETE_FACILITY).variable("id", id);
        self.pipeline.execute(op).await?.decode_field("deleteFacility")
    }
}
