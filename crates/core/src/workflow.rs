use chrono::{DateTime, Utc};

use crate::domain::action::{ActionId, ApprovalAction, Decision, WorkflowAction};
use crate::domain::request::{PurchaseRequest, RequestStatus};
use crate::domain::user::UserProfile;
use crate::errors::WorkflowError;
use crate::permissions::PermissionEvaluator;
use crate::policy::{PolicyCatalog, PolicyError};

/// Result of one successful transition: the mutated request plus the
/// single audit entry describing it. The two must be persisted as one
/// atomic unit; a partial write is a correctness violation.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub request: PurchaseRequest,
    pub audit: ApprovalAction,
}

/// The approval state machine.
///
/// Stateless between calls: all state lives in the persisted request and
/// audit records, so one engine instance serves any number of requests
/// without locking. Failures leave the input untouched and produce no
/// audit entry.
#[derive(Clone, Debug)]
pub struct WorkflowEngine {
    catalog: PolicyCatalog,
    evaluator: PermissionEvaluator,
}

impl WorkflowEngine {
    pub fn new(catalog: PolicyCatalog) -> Self {
        Self { catalog, evaluator: PermissionEvaluator }
    }

    pub fn apply(
        &self,
        request: &PurchaseRequest,
        actor: &UserProfile,
        action: WorkflowAction,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Transition, WorkflowError> {
        if request.status.is_terminal() {
            return Err(WorkflowError::invalid_state(
                request.status,
                action,
                "request is already closed",
            ));
        }

        match action {
            WorkflowAction::Submit => self.submit(request, actor, comment, at),
            WorkflowAction::Approve => self.approve(request, actor, comment, at),
            WorkflowAction::Reject => self.reject(request, actor, comment, at),
            WorkflowAction::Cancel => self.cancel(request, actor, comment, at),
            WorkflowAction::AdminOverride => self.admin_override(request, actor, comment, at),
        }
    }

    fn submit(
        &self,
        request: &PurchaseRequest,
        actor: &UserProfile,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Transition, WorkflowError> {
        if !matches!(request.status, RequestStatus::Draft | RequestStatus::Submitted) {
            return Err(WorkflowError::invalid_state(
                request.status,
                WorkflowAction::Submit,
                "only draft requests can be submitted",
            ));
        }

        self.check_access(actor, request, WorkflowAction::Submit)?;

        // The resolved sequence is frozen here; later policy edits never
        // touch an in-flight chain.
        let levels = self
            .catalog
            .resolve_levels(&request.request_type, request.amount)
            .map_err(|error| match error {
                PolicyError::NoApplicableLevels { request_type }
                | PolicyError::EmptyRequestType { request_type }
                | PolicyError::DuplicateOrdinal { request_type, .. } => {
                    WorkflowError::PolicyConfiguration { request_type }
                }
            })?;

        let mut next = request.clone();
        next.level_roles = levels.iter().map(|level| level.role).collect();
        next.current_level = 0;
        next.status = RequestStatus::PendingApproval;
        next.submitted_at = Some(at);
        next.updated_at = at;

        Ok(Transition {
            audit: self.audit_entry(&next, actor, None, Decision::Submitted, comment, at),
            request: next,
        })
    }

    fn approve(
        &self,
        request: &PurchaseRequest,
        actor: &UserProfile,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Transition, WorkflowError> {
        if request.status != RequestStatus::PendingApproval {
            return Err(WorkflowError::invalid_state(
                request.status,
                WorkflowAction::Approve,
                "request is not awaiting approval",
            ));
        }

        // A requester is refused as unauthorized even when their role
        // matches a level that already signed off.
        if actor.id == request.requester {
            self.check_access(actor, request, WorkflowAction::Approve)?;
        }

        // A retry from a level that already signed off is detected from
        // the recorded level itself, not a separate deduplication cache.
        if self.acted_at_passed_level(request, actor) {
            return Err(WorkflowError::invalid_state(
                request.status,
                WorkflowAction::Approve,
                format!("role `{}` already approved an earlier level", actor.role),
            ));
        }

        self.check_access(actor, request, WorkflowAction::Approve)?;

        let acted_level = request.current_level;
        let mut next = request.clone();
        if request.at_final_level() {
            next.status = RequestStatus::Approved;
        } else {
            next.current_level += 1;
        }
        next.updated_at = at;

        Ok(Transition {
            audit: self.audit_entry(
                &next,
                actor,
                Some(acted_level),
                Decision::Approved,
                comment,
                at,
            ),
            request: next,
        })
    }

    fn reject(
        &self,
        request: &PurchaseRequest,
        actor: &UserProfile,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Transition, WorkflowError> {
        if request.status != RequestStatus::PendingApproval {
            return Err(WorkflowError::invalid_state(
                request.status,
                WorkflowAction::Reject,
                "request is not awaiting approval",
            ));
        }

        self.check_access(actor, request, WorkflowAction::Reject)?;

        // Any authorized approver at the current level terminates the
        // chain; rejection never waits on other levels.
        let acted_level = request.current_level;
        let mut next = request.clone();
        next.status = RequestStatus::Rejected;
        next.updated_at = at;

        Ok(Transition {
            audit: self.audit_entry(
                &next,
                actor,
                Some(acted_level),
                Decision::Rejected,
                comment,
                at,
            ),
            request: next,
        })
    }

    fn cancel(
        &self,
        request: &PurchaseRequest,
        actor: &UserProfile,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Transition, WorkflowError> {
        self.check_access(actor, request, WorkflowAction::Cancel)?;

        // A mid-chain cancellation keeps the level it interrupted.
        let acted_level = (request.status == RequestStatus::PendingApproval)
            .then_some(request.current_level);

        let mut next = request.clone();
        next.status = RequestStatus::Cancelled;
        next.updated_at = at;

        Ok(Transition {
            audit: self.audit_entry(&next, actor, acted_level, Decision::Cancelled, comment, at),
            request: next,
        })
    }

    fn admin_override(
        &self,
        request: &PurchaseRequest,
        actor: &UserProfile,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Transition, WorkflowError> {
        if request.status != RequestStatus::PendingApproval {
            return Err(WorkflowError::invalid_state(
                request.status,
                WorkflowAction::AdminOverride,
                "there is no pending chain to override",
            ));
        }

        self.check_access(actor, request, WorkflowAction::AdminOverride)?;

        let acted_level = request.current_level;
        let mut next = request.clone();
        next.status = RequestStatus::Approved;
        next.updated_at = at;

        Ok(Transition {
            audit: self.audit_entry(
                &next,
                actor,
                Some(acted_level),
                Decision::AdminOverride,
                comment,
                at,
            ),
            request: next,
        })
    }

    fn check_access(
        &self,
        actor: &UserProfile,
        request: &PurchaseRequest,
        action: WorkflowAction,
    ) -> Result<(), WorkflowError> {
        let decision = self.evaluator.authorize(actor, request, action);
        if decision.allowed {
            Ok(())
        } else {
            Err(WorkflowError::Authorization { reason: decision.reason })
        }
    }

    fn acted_at_passed_level(&self, request: &PurchaseRequest, actor: &UserProfile) -> bool {
        let current = request.current_level as usize;
        let matches_current =
            request.level_roles.get(current).is_some_and(|role| *role == actor.role);

        !matches_current
            && request.level_roles.iter().take(current).any(|role| *role == actor.role)
    }

    fn audit_entry(
        &self,
        request: &PurchaseRequest,
        actor: &UserProfile,
        level: Option<u32>,
        decision: Decision,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> ApprovalAction {
        ApprovalAction {
            id: ActionId::generate(),
            request_id: request.id.clone(),
            actor: actor.id.clone(),
            level,
            decision,
            comment,
            recorded_at: at,
        }
    }
}
