use crate::domain::dashboard::DashboardTotals;
use crate::domain::dashboard::driven_ports::DashboardReader;
use crate::domain::project::driven_ports::{DetectProject, ProjectReader, ProjectWriter};
use crate::domain::project::{NewProject, Project, ProjectFilter, ProjectStatus, ProjectUpdate};
use crate::domain::risk_issue::driven_ports::{RiskIssueReader, RiskIssueWriter};
use crate::domain::risk_issue::{NewRiskIssue, RiskIssue, RiskIssueFilter, RiskIssueUpdate};
use crate::domain::task::driven_ports::{DetectTask, TaskReader, TaskWriter};
use crate::domain::task::{
    NewTask, Task, TaskDetails, TaskQuery, TaskSort, TaskSortField, TaskStatus, TaskUpdate,
};
use crate::domain::time_entry::driven_ports::{TimeEntryReader, TimeEntryWriter};
use crate::domain::time_entry::{NewTimeEntry, TimeEntry, TimeEntryUpdate};
use crate::domain::user::driven_ports::{DetectUser, UserReader, UserWriter};
use crate::domain::user::{CreateUser, User};
use crate::domain::SortDirection;
use crate::external_connections::ExternalConnectivity;
use anyhow::anyhow;
use chrono::{DateTime, TimeZone, Utc};
use std::cmp::Ordering;
use std::sync::RwLock;

/// A stable timestamp so records built in tests compare equal
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0)
        .single()
        .expect("fixed test timestamp is valid")
}

/// Connectivity represents the "connected" state of a mocked driven port and provides
/// common behavior for returning an error if the port is configured to be in a disconnected state.
pub enum Connectivity {
    Connected,
    Disconnected,
}

impl Connectivity {
    /// Return an error if connectivity is in a "disconnected" state
    pub fn blow_up_if_disconnected(&self) -> Result<(), anyhow::Error> {
        match self {
            Self::Connected => Ok(()),
            Self::Disconnected => Err(anyhow!("could not connect to service!")),
        }
    }
}

/// FakeImplementation is a quick drop-in property that helps mock a function and capture
/// arguments the function is called with. It's useful for mocking async functions since
/// popular rust mocking tools don't work well with async functions on traits.
///
/// * [Args] represents the arguments passed to the function that should be captured on a call
/// * [Ret] represents the type of the function's return value
///
/// # Example
///
/// This data structure can be used in mock trait implementations like so:
///
/// ```ignore
/// use project_tracker::domain::test_util::FakeImplementation;
/// use std::sync::Mutex;
///
/// trait MyAsyncTrait {
///   async fn some_cool_function(&self, var_1: i32, var_2: i32) -> String;
/// }
///
/// struct FakeTraitImplementation {
///   // The generics are (i32, i32) for captured arguments and String for the return value
///   some_cool_function_result: FakeImplementation<(i32, i32), String>;
/// }
///
/// impl MyAsyncTrait for Mutex<FakeTraitImplementation> {
///   async fn some_cool_function(&self, var_1: i32, var_2: i32) -> String {
///     // We have to lock "self" so we can mutate the interior via an immutable reference
///     let mut self_locked = self.lock().unwrap();
///     
///     // Capture the arguments of this invocation
///     self_locked.save_arguments((var_1, var_2));
///
///     // Return the configured return value
///     self_locked.return_value()
///   }
/// }
/// ```
///
pub struct FakeImplementation<Args, Ret> {
    saved_arguments: Vec<Args>,
    return_value: Option<Ret>,
}

impl<Args, Ret> FakeImplementation<Args, Ret> {
    /// Creates a new FakeImplementation
    pub fn new() -> FakeImplementation<Args, Ret> {
        FakeImplementation {
            saved_arguments: Vec::new(),
            return_value: None,
        }
    }
}

impl<Args, Ret> FakeImplementation<Args, Ret> {
    /// Saves arguments from a single invocation of the FakeImplementation
    pub fn save_arguments(&mut self, arguments: Args) {
        self.saved_arguments.push(arguments)
    }

    /// Returns the list of arguments passed on every call to this FakeImplementation
    pub fn calls(&self) -> &[Args] {
        self.saved_arguments.as_slice()
    }
}

#[allow(dead_code)]
impl<Args, Ret> FakeImplementation<Args, Ret>
where
    Ret: Clone,
{
    /// Set the value that should be returned when this FakeImplementation is invoked
    pub fn set_return_value(&mut self, return_value: Ret) {
        self.return_value = Some(return_value)
    }

    /// Retrieve the configured return value for this FakeImplementation
    pub fn return_value(&self) -> Ret {
        match self.return_value {
            None => panic!("Tried to return from a function where the return value wasn't set!"),
            Some(ref ret_val) => ret_val.clone(),
        }
    }
}

impl<Args, Success, Fail> FakeImplementation<Args, Result<Success, Fail>>
where
    Success: Clone,
    Fail: Clone,
{
    /// Set the result that should be returned when this FakeImplementation is invoked.
    /// [Result] does not implement [Clone], so this function can be used when the contained values
    /// can be cloned.
    pub fn set_returned_result(&mut self, return_value: Result<Success, Fail>) {
        match return_value {
            Ok(ok_result) => self.return_value = Some(Ok(ok_result)),
            Err(err) => self.return_value = Some(Err(err)),
        }
    }

    /// Retrieve the result that should be returned when this FakeImplementation is invoked (for [Result]s)
    pub fn return_value_result(&self) -> Result<Success, Fail> {
        match self.return_value {
            Some(Ok(ref ok_result)) => Ok(ok_result.clone()),
            Some(Err(ref err)) => Err(err.clone()),
            None => panic!("Tried to return from a function where the return value wasn't set!"),
        }
    }
}

impl<Args, Success> FakeImplementation<Args, anyhow::Result<Success>>
where
    Success: Clone,
{
    /// Set the result that should be returned when this FakeImplementation is invoked.
    /// This is used in a special case for [anyhow::Result], since [anyhow::Error] does not
    /// implement [Clone].
    pub fn set_returned_anyhow(&mut self, return_value: anyhow::Result<Success>) {
        match return_value {
            Ok(ok_result) => self.return_value = Some(Ok(ok_result)),
            Err(err) => self.return_value = Some(Err(anyhow!(format!("{}", err)))),
        }
    }

    /// Retrieve the result that should be returned when this FakeImplementation is invoked (for [anyhow::Result]s)
    pub fn return_value_anyhow(&self) -> anyhow::Result<Success> {
        match self.return_value {
            None => panic!("Tried to return from a function where the value wasn't set!"),
            Some(Ok(ref ok_result)) => Ok(ok_result.clone()),
            Some(Err(ref err)) => Err(anyhow!(format!("{}", err))),
        }
    }
}

/// Stores every record type in memory, honoring the same foreign key rules as the database.
/// Deleting a project removes its tasks and risks, deleting a task removes its time entries,
/// and deleting a user clears any references to them.
pub struct InMemoryPersistence {
    highest_user_id: i32,
    highest_project_id: i32,
    highest_task_id: i32,
    highest_time_entry_id: i32,
    highest_risk_issue_id: i32,
    pub users: Vec<User>,
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub time_entries: Vec<TimeEntry>,
    pub risks_issues: Vec<RiskIssue>,
    pub connectivity: Connectivity,
}

impl InMemoryPersistence {
    pub fn new() -> InMemoryPersistence {
        InMemoryPersistence {
            highest_user_id: 0,
            highest_project_id: 0,
            highest_task_id: 0,
            highest_time_entry_id: 0,
            highest_risk_issue_id: 0,
            users: Vec::new(),
            projects: Vec::new(),
            tasks: Vec::new(),
            time_entries: Vec::new(),
            risks_issues: Vec::new(),
            connectivity: Connectivity::Connected,
        }
    }

    pub fn new_with_users(users: &[CreateUser]) -> InMemoryPersistence {
        let mut persistence = Self::new();
        for user in users {
            persistence.insert_user(user.clone());
        }
        persistence
    }

    pub fn new_with_projects(projects: &[NewProject]) -> InMemoryPersistence {
        let mut persistence = Self::new();
        for project in projects {
            persistence.insert_project(project.clone());
        }
        persistence
    }

    pub fn new_locked() -> RwLock<InMemoryPersistence> {
        RwLock::new(Self::new())
    }

    pub fn insert_user(&mut self, user: CreateUser) -> i32 {
        self.highest_user_id += 1;
        self.users.push(User {
            id: self.highest_user_id,
            name: user.name,
            email: user.email,
            created_at: fixed_time(),
            updated_at: fixed_time(),
        });

        self.highest_user_id
    }

    pub fn insert_project(&mut self, project: NewProject) -> i32 {
        self.highest_project_id += 1;
        self.projects.push(Project {
            id: self.highest_project_id,
            name: project.name,
            description: project.description,
            estimated_budget: project.estimated_budget,
            actual_expenditure: project.actual_expenditure,
            status: project.status,
            start_date: project.start_date,
            end_date: project.end_date,
            manager_id: project.manager_id,
            created_at: fixed_time(),
            updated_at: fixed_time(),
        });

        self.highest_project_id
    }

    pub fn insert_task(&mut self, task: NewTask) -> i32 {
        self.highest_task_id += 1;
        self.tasks.push(Task {
            id: self.highest_task_id,
            title: task.title,
            description: task.description,
            project_id: task.project_id,
            assignee_id: Some(task.assignee_id),
            due_date: Some(task.due_date),
            priority: task.priority,
            status: task.status,
            estimated_hours: task.estimated_hours,
            created_at: fixed_time(),
            updated_at: fixed_time(),
        });

        self.highest_task_id
    }

    pub fn insert_time_entry(&mut self, task_id: i32, entry: NewTimeEntry) -> i32 {
        self.highest_time_entry_id += 1;
        self.time_entries.push(TimeEntry {
            id: self.highest_time_entry_id,
            task_id,
            description: entry.description,
            start_time: entry.start_time,
            end_time: entry.end_time,
            duration: entry.duration,
            created_at: fixed_time(),
            updated_at: fixed_time(),
        });

        self.highest_time_entry_id
    }

    pub fn insert_risk_issue(&mut self, risk_issue: NewRiskIssue) -> i32 {
        self.highest_risk_issue_id += 1;
        self.risks_issues.push(RiskIssue {
            id: self.highest_risk_issue_id,
            project_id: risk_issue.project_id,
            title: risk_issue.title,
            description: risk_issue.description,
            kind: risk_issue.kind,
            severity: risk_issue.severity,
            status: risk_issue.status,
            due_date: risk_issue.due_date,
            assigned_to: risk_issue.assigned_to,
            created_at: fixed_time(),
            updated_at: fixed_time(),
        });

        self.highest_risk_issue_id
    }

    /// Removes tasks matching [doomed] along with their time entries
    fn remove_tasks(&mut self, doomed: impl Fn(&Task) -> bool) -> usize {
        let removed_ids: Vec<i32> = self
            .tasks
            .iter()
            .filter(|&task| doomed(task))
            .map(|task| task.id)
            .collect();
        self.tasks.retain(|task| !removed_ids.contains(&task.id));
        self.time_entries
            .retain(|entry| !removed_ids.contains(&entry.task_id));

        removed_ids.len()
    }

    fn details(&self, task: &Task) -> Result<TaskDetails, anyhow::Error> {
        let project = self
            .projects
            .iter()
            .find(|project| project.id == task.project_id)
            .ok_or_else(|| anyhow!("task {} references missing project", task.id))?;
        let assignee = task
            .assignee_id
            .and_then(|assignee_id| self.users.iter().find(|user| user.id == assignee_id));

        Ok(TaskDetails {
            task: task.clone(),
            project: project.clone(),
            assignee: assignee.cloned(),
        })
    }
}

/// Compares two optional values so that missing values always sort last
fn compare_nulls_last<T: PartialOrd>(
    first: Option<T>,
    second: Option<T>,
    direction: SortDirection,
) -> Ordering {
    match (first, second) {
        (Some(first), Some(second)) => {
            let ordering = first.partial_cmp(&second).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_tasks(first: &Task, second: &Task, sort: TaskSort) -> Ordering {
    let direction = sort.direction;
    let ordering = match sort.field {
        TaskSortField::Id => compare_nulls_last(Some(first.id), Some(second.id), direction),
        TaskSortField::Title => {
            compare_nulls_last(Some(&first.title), Some(&second.title), direction)
        }
        TaskSortField::DueDate => compare_nulls_last(first.due_date, second.due_date, direction),
        TaskSortField::Priority => {
            compare_nulls_last(Some(first.priority), Some(second.priority), direction)
        }
        TaskSortField::Status => {
            compare_nulls_last(Some(first.status), Some(second.status), direction)
        }
        TaskSortField::EstimatedHours => {
            compare_nulls_last(first.estimated_hours, second.estimated_hours, direction)
        }
        TaskSortField::CreatedAt => {
            compare_nulls_last(Some(first.created_at), Some(second.created_at), direction)
        }
        TaskSortField::UpdatedAt => {
            compare_nulls_last(Some(first.updated_at), Some(second.updated_at), direction)
        }
    };

    ordering.then(first.id.cmp(&second.id))
}

impl UserReader for RwLock<InMemoryPersistence> {
    async fn all(&self, _: &mut impl ExternalConnectivity) -> Result<Vec<User>, anyhow::Error> {
        let persister = self.read().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        Ok(persister.users.clone())
    }

    async fn by_id(
        &self,
        id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Option<User>, anyhow::Error> {
        let persister = self.read().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        Ok(persister.users.iter().find(|user| user.id == id).cloned())
    }
}

impl UserWriter for RwLock<InMemoryPersistence> {
    async fn create_user(
        &self,
        user: &CreateUser,
        _: &mut impl ExternalConnectivity,
    ) -> Result<i32, anyhow::Error> {
        let mut persister = self.write().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        Ok(persister.insert_user(user.clone()))
    }

    async fn delete_user(
        &self,
        id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut persister = self.write().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        let user_count = persister.users.len();
        persister.users.retain(|user| user.id != id);
        if persister.users.len() == user_count {
            return Ok(false);
        }

        for task in persister.tasks.iter_mut() {
            if task.assignee_id == Some(id) {
                task.assignee_id = None;
            }
        }
        for project in persister.projects.iter_mut() {
            if project.manager_id == Some(id) {
                project.manager_id = None;
            }
        }
        for risk_issue in persister.risks_issues.iter_mut() {
            if risk_issue.assigned_to == Some(id) {
                risk_issue.assigned_to = None;
            }
        }

        Ok(true)
    }
}

impl DetectUser for RwLock<InMemoryPersistence> {
    async fn user_exists(
        &self,
        user_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let detector = self.read().expect("persistence rwlock poisoned");
        detector.connectivity.blow_up_if_disconnected()?;

        Ok(detector.users.iter().any(|user| user.id == user_id))
    }

    async fn user_with_email_exists(
        &self,
        email: &str,
        _: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let detector = self.read().expect("persistence rwlock poisoned");
        detector.connectivity.blow_up_if_disconnected()?;

        Ok(detector.users.iter().any(|user| user.email == email))
    }
}

impl ProjectReader for RwLock<InMemoryPersistence> {
    async fn all(
        &self,
        filter: &ProjectFilter,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Vec<Project>, anyhow::Error> {
        let persister = self.read().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        Ok(persister
            .projects
            .iter()
            .filter(|project| filter.status.is_none_or(|status| project.status == status))
            .filter(|project| {
                filter
                    .manager_id
                    .is_none_or(|manager_id| project.manager_id == Some(manager_id))
            })
            .cloned()
            .collect())
    }

    async fn by_id(
        &self,
        id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Option<Project>, anyhow::Error> {
        let persister = self.read().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        Ok(persister
            .projects
            .iter()
            .find(|project| project.id == id)
            .cloned())
    }
}

impl ProjectWriter for RwLock<InMemoryPersistence> {
    async fn create_project(
        &self,
        project: &NewProject,
        _: &mut impl ExternalConnectivity,
    ) -> Result<i32, anyhow::Error> {
        let mut persister = self.write().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        Ok(persister.insert_project(project.clone()))
    }

    async fn update_project(
        &self,
        id: i32,
        update: &ProjectUpdate,
        _: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut persister = self.write().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        let project = persister
            .projects
            .iter_mut()
            .find(|project| project.id == id)
            .ok_or_else(|| anyhow!("project {id} does not exist"))?;
        if let Some(name) = &update.name {
            project.name = name.clone();
        }
        if let Some(description) = &update.description {
            project.description = description.clone();
        }
        if let Some(estimated_budget) = &update.estimated_budget {
            project.estimated_budget = estimated_budget.clone();
        }
        if let Some(actual_expenditure) = &update.actual_expenditure {
            project.actual_expenditure = actual_expenditure.clone();
        }
        if let Some(status) = update.status {
            project.status = status;
        }
        if let Some(start_date) = update.start_date {
            project.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            project.end_date = end_date;
        }
        if let Some(manager_id) = update.manager_id {
            project.manager_id = manager_id;
        }
        project.updated_at = Utc::now();

        Ok(())
    }

    async fn delete_project(
        &self,
        id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut persister = self.write().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        let project_count = persister.projects.len();
        persister.projects.retain(|project| project.id != id);
        if persister.projects.len() == project_count {
            return Ok(false);
        }
        persister.remove_tasks(|task| task.project_id == id);
        persister
            .risks_issues
            .retain(|risk_issue| risk_issue.project_id != id);

        Ok(true)
    }
}

impl DetectProject for RwLock<InMemoryPersistence> {
    async fn project_exists(
        &self,
        id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let detector = self.read().expect("persistence rwlock poisoned");
        detector.connectivity.blow_up_if_disconnected()?;

        Ok(detector.projects.iter().any(|project| project.id == id))
    }
}

impl TaskReader for RwLock<InMemoryPersistence> {
    async fn all(
        &self,
        query: &TaskQuery,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TaskDetails>, anyhow::Error> {
        let persister = self.read().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        let filter = &query.filter;
        let mut tasks: Vec<&Task> = persister
            .tasks
            .iter()
            .filter(|task| filter.status.is_none_or(|status| task.status == status))
            .filter(|task| filter.priority.is_none_or(|priority| task.priority == priority))
            .filter(|task| {
                filter
                    .project_id
                    .is_none_or(|project_id| task.project_id == project_id)
            })
            .filter(|task| {
                filter
                    .assignee_id
                    .is_none_or(|assignee_id| task.assignee_id == Some(assignee_id))
            })
            .collect();
        tasks.sort_by(|first, second| compare_tasks(first, second, query.sort));

        tasks.into_iter().map(|task| persister.details(task)).collect()
    }

    async fn by_id(
        &self,
        id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Option<TaskDetails>, anyhow::Error> {
        let persister = self.read().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        persister
            .tasks
            .iter()
            .find(|task| task.id == id)
            .map(|task| persister.details(task))
            .transpose()
    }

    async fn upcoming(
        &self,
        from: DateTime<Utc>,
        limit: i64,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TaskDetails>, anyhow::Error> {
        let persister = self.read().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        let mut tasks: Vec<&Task> = persister
            .tasks
            .iter()
            .filter(|task| task.status != TaskStatus::Completed)
            .filter(|task| task.due_date.is_some_and(|due_date| due_date >= from))
            .collect();
        tasks.sort_by(|first, second| compare_tasks(first, second, TaskSort::default()));

        tasks
            .into_iter()
            .take(usize::try_from(limit)?)
            .map(|task| persister.details(task))
            .collect()
    }
}

impl TaskWriter for RwLock<InMemoryPersistence> {
    async fn create_task(
        &self,
        task: &NewTask,
        _: &mut impl ExternalConnectivity,
    ) -> Result<i32, anyhow::Error> {
        let mut persister = self.write().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        Ok(persister.insert_task(task.clone()))
    }

    async fn update_task(
        &self,
        id: i32,
        update: &TaskUpdate,
        _: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut persister = self.write().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        let task = persister
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| anyhow!("task {id} does not exist"))?;
        if let Some(title) = &update.title {
            task.title = title.clone();
        }
        if let Some(description) = &update.description {
            task.description = description.clone();
        }
        if let Some(project_id) = update.project_id {
            task.project_id = project_id;
        }
        if let Some(assignee_id) = update.assignee_id {
            task.assignee_id = Some(assignee_id);
        }
        if let Some(due_date) = update.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(status) = update.status {
            task.status = status;
        }
        if let Some(estimated_hours) = update.estimated_hours {
            task.estimated_hours = estimated_hours;
        }
        task.updated_at = Utc::now();

        Ok(())
    }

    async fn delete_task(
        &self,
        id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut persister = self.write().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        Ok(persister.remove_tasks(|task| task.id == id) > 0)
    }
}

impl DetectTask for RwLock<InMemoryPersistence> {
    async fn task_exists(
        &self,
        id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let detector = self.read().expect("persistence rwlock poisoned");
        detector.connectivity.blow_up_if_disconnected()?;

        Ok(detector.tasks.iter().any(|task| task.id == id))
    }
}

impl TimeEntryReader for RwLock<InMemoryPersistence> {
    async fn for_task(
        &self,
        task_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TimeEntry>, anyhow::Error> {
        let persister = self.read().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        let mut entries: Vec<TimeEntry> = persister
            .time_entries
            .iter()
            .filter(|entry| entry.task_id == task_id)
            .cloned()
            .collect();
        entries.sort_by(|first, second| {
            second
                .start_time
                .cmp(&first.start_time)
                .then(second.id.cmp(&first.id))
        });

        Ok(entries)
    }

    async fn by_id(
        &self,
        task_id: i32,
        id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Option<TimeEntry>, anyhow::Error> {
        let persister = self.read().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        Ok(persister
            .time_entries
            .iter()
            .find(|entry| entry.id == id && entry.task_id == task_id)
            .cloned())
    }
}

impl TimeEntryWriter for RwLock<InMemoryPersistence> {
    async fn create_time_entry(
        &self,
        task_id: i32,
        entry: &NewTimeEntry,
        _: &mut impl ExternalConnectivity,
    ) -> Result<i32, anyhow::Error> {
        let mut persister = self.write().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        Ok(persister.insert_time_entry(task_id, entry.clone()))
    }

    async fn update_time_entry(
        &self,
        id: i32,
        update: &TimeEntryUpdate,
        _: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut persister = self.write().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        let entry = persister
            .time_entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| anyhow!("time entry {id} does not exist"))?;
        if let Some(description) = &update.description {
            entry.description = description.clone();
        }
        if let Some(start_time) = update.start_time {
            entry.start_time = start_time;
        }
        if let Some(end_time) = update.end_time {
            entry.end_time = end_time;
        }
        if let Some(duration) = update.duration {
            entry.duration = duration;
        }
        entry.updated_at = Utc::now();

        Ok(())
    }

    async fn delete_time_entry(
        &self,
        task_id: i32,
        id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut persister = self.write().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        let entry_count = persister.time_entries.len();
        persister
            .time_entries
            .retain(|entry| !(entry.id == id && entry.task_id == task_id));

        Ok(persister.time_entries.len() != entry_count)
    }
}

impl RiskIssueReader for RwLock<InMemoryPersistence> {
    async fn all(
        &self,
        filter: &RiskIssueFilter,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Vec<RiskIssue>, anyhow::Error> {
        let persister = self.read().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        Ok(persister
            .risks_issues
            .iter()
            .filter(|risk_issue| {
                filter
                    .project_id
                    .is_none_or(|project_id| risk_issue.project_id == project_id)
            })
            .filter(|risk_issue| filter.kind.is_none_or(|kind| risk_issue.kind == kind))
            .filter(|risk_issue| filter.status.is_none_or(|status| risk_issue.status == status))
            .cloned()
            .collect())
    }

    async fn by_id(
        &self,
        id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Option<RiskIssue>, anyhow::Error> {
        let persister = self.read().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        Ok(persister
            .risks_issues
            .iter()
            .find(|risk_issue| risk_issue.id == id)
            .cloned())
    }
}

impl RiskIssueWriter for RwLock<InMemoryPersistence> {
    async fn create_risk_issue(
        &self,
        risk_issue: &NewRiskIssue,
        _: &mut impl ExternalConnectivity,
    ) -> Result<i32, anyhow::Error> {
        let mut persister = self.write().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        Ok(persister.insert_risk_issue(risk_issue.clone()))
    }

    async fn update_risk_issue(
        &self,
        id: i32,
        update: &RiskIssueUpdate,
        _: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut persister = self.write().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        let risk_issue = persister
            .risks_issues
            .iter_mut()
            .find(|risk_issue| risk_issue.id == id)
            .ok_or_else(|| anyhow!("risk or issue {id} does not exist"))?;
        if let Some(project_id) = update.project_id {
            risk_issue.project_id = project_id;
        }
        if let Some(title) = &update.title {
            risk_issue.title = title.clone();
        }
        if let Some(description) = &update.description {
            risk_issue.description = description.clone();
        }
        if let Some(kind) = update.kind {
            risk_issue.kind = kind;
        }
        if let Some(severity) = update.severity {
            risk_issue.severity = severity;
        }
        if let Some(status) = update.status {
            risk_issue.status = status;
        }
        if let Some(due_date) = update.due_date {
            risk_issue.due_date = due_date;
        }
        if let Some(assigned_to) = update.assigned_to {
            risk_issue.assigned_to = assigned_to;
        }
        risk_issue.updated_at = Utc::now();

        Ok(())
    }

    async fn delete_risk_issue(
        &self,
        id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut persister = self.write().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        let risk_count = persister.risks_issues.len();
        persister.risks_issues.retain(|risk_issue| risk_issue.id != id);

        Ok(persister.risks_issues.len() != risk_count)
    }
}

impl DashboardReader for RwLock<InMemoryPersistence> {
    async fn totals(
        &self,
        _: &mut impl ExternalConnectivity,
    ) -> Result<DashboardTotals, anyhow::Error> {
        let persister = self.read().expect("persistence rwlock poisoned");
        persister.connectivity.blow_up_if_disconnected()?;

        let count = |amount: usize| i64::try_from(amount);
        Ok(DashboardTotals {
            total_projects: count(persister.projects.len())?,
            active_projects: count(
                persister
                    .projects
                    .iter()
                    .filter(|project| project.status == ProjectStatus::InProgress)
                    .count(),
            )?,
            total_tasks: count(persister.tasks.len())?,
            completed_tasks: count(
                persister
                    .tasks
                    .iter()
                    .filter(|task| task.status == TaskStatus::Completed)
                    .count(),
            )?,
            total_team_members: count(persister.users.len())?,
            total_estimated_budget: persister
                .projects
                .iter()
                .filter_map(|project| project.estimated_budget.as_ref())
                .sum(),
            total_actual_expenditure: persister
                .projects
                .iter()
                .filter_map(|project| project.actual_expenditure.as_ref())
                .sum(),
        })
    }
}
