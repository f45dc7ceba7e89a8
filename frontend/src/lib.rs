use sauron::{
    html::{attributes, attributes::*, *},
    prelude::*,
};
use serde::de::DeserializeOwned;
use shared::{
    CreateTaskRequest, ErrorBody, Priority, Task, TaskListQuery, TaskPage, UpdateTaskRequest,
};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{console, window, Request, RequestInit, Response, UrlSearchParams};

const API_BASE_URL: &str = "/api";
const ITEMS_PER_PAGE: u64 = 5;
const ERROR_DISPLAY_MS: i32 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    const ALL: [Filter; 3] = [Filter::All, Filter::Active, Filter::Completed];

    fn completed(self) -> Option<bool> {
        match self {
            Filter::All => None,
            Filter::Active => Some(false),
            Filter::Completed => Some(true),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Active => "Active",
            Filter::Completed => "Completed",
        }
    }
}

fn list_query(filter: Filter, page: u64) -> TaskListQuery {
    TaskListQuery {
        completed: filter.completed(),
        page,
        limit: ITEMS_PER_PAGE,
        ..Default::default()
    }
}

fn page_label(current_page: u64, total_pages: u64) -> String {
    format!("Page {} of {}", current_page, total_pages.max(1))
}

fn parse_priority(raw: &str) -> Priority {
    raw.parse().unwrap_or_default()
}

#[derive(Debug, Clone)]
pub enum Msg {
    LoadTasks,
    TasksLoaded(TaskPage),
    SetFilter(Filter),
    PrevPage,
    NextPage,

    SetNewTaskTitle(String),
    SetNewTaskDescription(String),
    SetNewTaskPriority(String),
    CreateTask,
    TaskCreated,

    ToggleTask(i64, bool),
    DeleteTask(i64),
    TaskChanged,

    EditTask(i64),
    SetEditTitle(String),
    SetEditDescription(String),
    SetEditPriority(String),
    ToggleEditCompleted,
    SaveEdit,
    CancelEdit,

    Error(String),
    HideError(u32),
}

#[derive(Debug, Clone)]
struct EditForm {
    task_id: i64,
    task_title: String,
    description: String,
    priority: Priority,
    completed: bool,
}

#[derive(Debug, Clone)]
pub struct Model {
    tasks: Vec<Task>,
    filter: Filter,
    current_page: u64,
    total_pages: u64,
    total_tasks: u64,
    loading: bool,
    new_task_title: String,
    new_task_description: String,
    new_task_priority: Priority,
    editing: Option<EditForm>,
    error: Option<String>,
    error_seq: u32,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            filter: Filter::All,
            current_page: 1,
            total_pages: 1,
            total_tasks: 0,
            loading: false,
            new_task_title: String::new(),
            new_task_description: String::new(),
            new_task_priority: Priority::Medium,
            editing: None,
            error: None,
            error_seq: 0,
        }
    }
}

impl Model {
    fn reset_new_task_form(&mut self) {
        self.new_task_title.clear();
        self.new_task_description.clear();
        self.new_task_priority = Priority::Medium;
        self.current_page = 1;
    }

    /// The server is the only source of truth; every mutation ends here.
    fn reload(&mut self) -> Cmd<Msg> {
        self.loading = true;
        let query = list_query(self.filter, self.current_page);
        Cmd::new(async move {
            match fetch_tasks(query).await {
                Ok(page) => Msg::TasksLoaded(page),
                Err(e) => Msg::Error(e),
            }
        })
    }
}

impl Application for Model {
    type MSG = Msg;

    fn init(&mut self) -> Cmd<Msg> {
        Cmd::new(async { Msg::LoadTasks })
    }

    fn update(&mut self, msg: Msg) -> Cmd<Msg> {
        match msg {
            Msg::LoadTasks => self.reload(),
            Msg::TasksLoaded(page) => {
                self.loading = false;
                // the last item of the last page was removed; step back
                if page.tasks.is_empty() && page.current_page > 1 {
                    self.current_page = page.total_pages.max(1);
                    return self.reload();
                }
                self.tasks = page.tasks;
                self.total_tasks = page.total;
                self.total_pages = page.total_pages;
                self.current_page = page.current_page;
                Cmd::none()
            }
            Msg::SetFilter(filter) => {
                self.filter = filter;
                self.current_page = 1;
                self.reload()
            }
            Msg::PrevPage => {
                if self.current_page > 1 {
                    self.current_page -= 1;
                    self.reload()
                } else {
                    Cmd::none()
                }
            }
            Msg::NextPage => {
                if self.current_page < self.total_pages {
                    self.current_page += 1;
                    self.reload()
                } else {
                    Cmd::none()
                }
            }
            Msg::SetNewTaskTitle(task_title) => {
                self.new_task_title = task_title;
                Cmd::none()
            }
            Msg::SetNewTaskDescription(description) => {
                self.new_task_description = description;
                Cmd::none()
            }
            Msg::SetNewTaskPriority(raw) => {
                self.new_task_priority = parse_priority(&raw);
                Cmd::none()
            }
            Msg::CreateTask => {
                let task_title = self.new_task_title.trim().to_string();
                if task_title.is_empty() {
                    return Cmd::none();
                }
                let request = CreateTaskRequest {
                    title: Some(task_title),
                    description: Some(self.new_task_description.trim().to_string()),
                    priority: Some(self.new_task_priority),
                    due_date: None,
                };
                Cmd::new(async move {
                    match create_task(request).await {
                        Ok(_) => Msg::TaskCreated,
                        Err(e) => Msg::Error(e),
                    }
                })
            }
            Msg::TaskCreated => {
                self.reset_new_task_form();
                self.reload()
            }
            Msg::ToggleTask(task_id, completed) => {
                let request = UpdateTaskRequest {
                    completed: Some(completed),
                    ..Default::default()
                };
                Cmd::new(async move {
                    match update_task(task_id, request).await {
                        Ok(_) => Msg::TaskChanged,
                        Err(e) => Msg::Error(e),
                    }
                })
            }
            Msg::DeleteTask(task_id) => {
                let confirmed = window()
                    .and_then(|w| {
                        w.confirm_with_message("Are you sure you want to delete this task?")
                            .ok()
                    })
                    .unwrap_or(false);
                if !confirmed {
                    return Cmd::none();
                }
                Cmd::new(async move {
                    match delete_task(task_id).await {
                        Ok(()) => Msg::TaskChanged,
                        Err(e) => Msg::Error(e),
                    }
                })
            }
            Msg::TaskChanged => self.reload(),
            Msg::EditTask(task_id) => {
                self.editing = self.tasks.iter().find(|t| t.id == task_id).map(|t| EditForm {
                    task_id: t.id,
                    task_title: t.title.clone(),
                    description: t.description.clone(),
                    priority: t.priority,
                    completed: t.completed,
                });
                Cmd::none()
            }
            Msg::SetEditTitle(task_title) => {
                if let Some(form) = self.editing.as_mut() {
                    form.task_title = task_title;
                }
                Cmd::none()
            }
            Msg::SetEditDescription(description) => {
                if let Some(form) = self.editing.as_mut() {
                    form.description = description;
                }
                Cmd::none()
            }
            Msg::SetEditPriority(raw) => {
                if let Some(form) = self.editing.as_mut() {
                    form.priority = parse_priority(&raw);
                }
                Cmd::none()
            }
            Msg::ToggleEditCompleted => {
                if let Some(form) = self.editing.as_mut() {
                    form.completed = !form.completed;
                }
                Cmd::none()
            }
            Msg::SaveEdit => {
                let Some(form) = self.editing.clone() else {
                    return Cmd::none();
                };
                let task_title = form.task_title.trim().to_string();
                if task_title.is_empty() {
                    return Cmd::new(async { Msg::Error("Task title must not be empty".to_string()) });
                }
                self.editing = None;
                let request = UpdateTaskRequest {
                    title: Some(task_title),
                    description: Some(form.description.trim().to_string()),
                    completed: Some(form.completed),
                    priority: Some(form.priority),
                    due_date: None,
                };
                Cmd::new(async move {
                    match update_task(form.task_id, request).await {
                        Ok(_) => Msg::TaskChanged,
                        Err(e) => Msg::Error(e),
                    }
                })
            }
            Msg::CancelEdit => {
                self.editing = None;
                Cmd::none()
            }
            Msg::Error(error) => {
                console::log_1(&format!("Error: {}", error).into());
                self.loading = false;
                self.error = Some(error);
                self.error_seq = self.error_seq.wrapping_add(1);
                let seq = self.error_seq;
                Cmd::new(async move {
                    sleep_ms(ERROR_DISPLAY_MS).await;
                    Msg::HideError(seq)
                })
            }
            Msg::HideError(seq) => {
                // a newer error restarted the timer
                if seq == self.error_seq {
                    self.error = None;
                }
                Cmd::none()
            }
        }
    }

    fn view(&self) -> Node<Msg> {
        div(
            [class("min-h-screen bg-ctp-base text-ctp-text")],
            [
                header([class("bg-ctp-mantle shadow-lg border-b border-ctp-surface0")], [
                    div([class("max-w-3xl mx-auto px-6 py-4")], [
                        h1([class("text-2xl font-bold text-ctp-text")], [text("Todo List")]),
                    ]),
                ]),
                div(
                    [class("max-w-3xl mx-auto px-6 py-8 space-y-6")],
                    [
                        self.view_error(),
                        self.view_create_form(),
                        self.view_stats(),
                        self.view_filters(),
                        self.view_task_list(),
                        self.view_pagination(),
                    ],
                ),
                self.view_edit_modal(),
            ],
        )
    }
}

impl Model {
    fn view_error(&self) -> Node<Msg> {
        match &self.error {
            Some(message) => div(
                [class("px-4 py-3 rounded-md bg-ctp-red/20 text-ctp-red border border-ctp-red")],
                [text(message)],
            ),
            None => span([], []),
        }
    }

    fn view_priority_select<F>(&self, current: Priority, on_select: F) -> Node<Msg>
    where
        F: Fn(String) -> Msg + 'static,
    {
        select(
            [
                on_input(move |event| on_select(event.value())),
                class("px-3 py-2 bg-ctp-surface0 border border-ctp-surface2 rounded-md text-ctp-text focus:outline-none focus:ring-2 focus:ring-ctp-blue"),
            ],
            Priority::ALL.iter().map(|priority| {
                option(
                    [value(priority.as_str()), selected(*priority == current)],
                    [text(priority.label())],
                )
            }),
        )
    }

    fn view_create_form(&self) -> Node<Msg> {
        div(
            [class("p-6 bg-ctp-surface1 rounded-lg border border-ctp-surface2")],
            [
                h2([class("text-xl font-semibold text-ctp-text mb-4 pb-2 border-b border-ctp-surface2")], [text("Add New Task")]),
                div([class("space-y-4")], [
                    input([
                        r#type("text"),
                        placeholder("Task title"),
                        value(&self.new_task_title),
                        on_input(|event| Msg::SetNewTaskTitle(event.value())),
                        class("w-full px-3 py-2 bg-ctp-surface0 border border-ctp-surface2 rounded-md text-ctp-text placeholder-ctp-subtext0 focus:outline-none focus:ring-2 focus:ring-ctp-blue focus:border-transparent"),
                    ], []),
                    textarea([
                        placeholder("Task description"),
                        value(&self.new_task_description),
                        on_input(|event| Msg::SetNewTaskDescription(event.value())),
                        class("w-full px-3 py-2 bg-ctp-surface0 border border-ctp-surface2 rounded-md text-ctp-text placeholder-ctp-subtext0 focus:outline-none focus:ring-2 focus:ring-ctp-blue focus:border-transparent h-20 resize-y"),
                    ], []),
                    div([class("flex items-center gap-4")], [
                        self.view_priority_select(self.new_task_priority, Msg::SetNewTaskPriority),
                        button([
                            on_click(|_| Msg::CreateTask),
                            class("bg-ctp-blue hover:bg-ctp-sapphire text-ctp-base font-medium px-6 py-2 rounded-md transition-colors duration-200"),
                        ], [text("Add Task")]),
                    ]),
                ]),
            ],
        )
    }

    fn view_stats(&self) -> Node<Msg> {
        let completed_on_page = self.tasks.iter().filter(|t| t.completed).count();
        div([class("grid grid-cols-2 gap-6")], [
            self.stat_card("Total Tasks", &self.total_tasks.to_string()),
            self.stat_card("Completed (this page)", &completed_on_page.to_string()),
        ])
    }

    fn stat_card(&self, card_title: &str, count: &str) -> Node<Msg> {
        div([class("bg-ctp-surface0 rounded-lg p-4 border border-ctp-surface1")], [
            p([class("text-sm text-ctp-subtext0")], [text(card_title)]),
            p([class("text-2xl font-bold text-ctp-text")], [text(count)]),
        ])
    }

    fn view_filters(&self) -> Node<Msg> {
        div(
            [class("flex gap-2")],
            Filter::ALL.iter().map(|filter| {
                let filter = *filter;
                let is_active = self.filter == filter;
                button([
                    on_click(move |_| Msg::SetFilter(filter)),
                    class(&format!(
                        "px-4 py-2 rounded-md text-sm font-medium transition-colors duration-200 {}",
                        if is_active {
                            "bg-ctp-blue text-ctp-base"
                        } else {
                            "bg-ctp-surface0 text-ctp-subtext0 hover:text-ctp-text hover:bg-ctp-surface1"
                        }
                    )),
                ], [text(filter.label())])
            }),
        )
    }

    fn view_task_list(&self) -> Node<Msg> {
        if self.loading && self.tasks.is_empty() {
            return p([class("text-center py-12 text-ctp-subtext0")], [text("Loading...")]);
        }
        if self.tasks.is_empty() {
            return div([class("text-center py-12")], [
                h3([class("text-lg font-medium text-ctp-text mb-2")], [text("No tasks found")]),
                p([class("text-ctp-subtext0")], [text("Create a new one above to get started!")]),
            ]);
        }
        ul(
            [class("space-y-4")],
            self.tasks.iter().map(|task| self.view_task(task)),
        )
    }

    fn view_task(&self, task: &Task) -> Node<Msg> {
        let task_id = task.id;
        let completed = task.completed;
        li(
            [
                key(task.id.to_string()),
                class(&format!(
                    "flex items-start gap-4 border rounded-xl p-6 bg-ctp-surface0 shadow-sm {}",
                    if completed {
                        "border-ctp-green bg-ctp-green/10"
                    } else {
                        "border-ctp-surface1 hover:border-ctp-blue"
                    }
                )),
            ],
            [
                input([
                    r#type("checkbox"),
                    checked(completed),
                    on_click(move |_| Msg::ToggleTask(task_id, !completed)),
                    class("mt-1 w-5 h-5"),
                ], []),
                div([class("flex-1 min-w-0")], [
                    h3([class(&format!(
                        "text-lg font-semibold {}",
                        if completed { "line-through text-ctp-overlay1" } else { "text-ctp-text" }
                    ))], [text(&task.title)]),
                    if task.description.is_empty() {
                        span([], [])
                    } else {
                        p([class("text-sm text-ctp-subtext1 break-words")], [text(&task.description)])
                    },
                ]),
                span([class(&format!(
                    "px-2 py-1 rounded-full text-xs font-medium {}",
                    match task.priority {
                        Priority::Low => "bg-ctp-green/20 text-ctp-green",
                        Priority::Medium => "bg-ctp-yellow/20 text-ctp-yellow",
                        Priority::High => "bg-ctp-red/20 text-ctp-red",
                    }
                ))], [text(task.priority.label())]),
                div([class("flex flex-col gap-2")], [
                    button([
                        on_click(move |_| Msg::EditTask(task_id)),
                        class("w-8 h-8 rounded-lg bg-ctp-blue/20 text-ctp-blue hover:bg-ctp-blue/30"),
                        r#type("button"),
                    ], [text("✏️")]),
                    button([
                        on_click(move |_| Msg::DeleteTask(task_id)),
                        class("w-8 h-8 rounded-lg bg-ctp-red/20 text-ctp-red hover:bg-ctp-red/30"),
                        r#type("button"),
                    ], [text("🗑️")]),
                ]),
            ],
        )
    }

    fn view_pagination(&self) -> Node<Msg> {
        div([class("flex items-center justify-between")], [
            button([
                on_click(|_| Msg::PrevPage),
                disabled(self.current_page <= 1),
                class("px-4 py-2 rounded-md bg-ctp-surface0 disabled:opacity-50"),
            ], [text("Prev")]),
            span([class("text-ctp-subtext1")], [text(page_label(self.current_page, self.total_pages))]),
            button([
                on_click(|_| Msg::NextPage),
                disabled(self.current_page >= self.total_pages),
                class("px-4 py-2 rounded-md bg-ctp-surface0 disabled:opacity-50"),
            ], [text("Next")]),
        ])
    }

    fn view_edit_modal(&self) -> Node<Msg> {
        let Some(form) = &self.editing else {
            return span([], []);
        };
        div([class("fixed inset-0 bg-black/50 flex items-center justify-center")], [
            div([class("w-full max-w-lg p-6 bg-ctp-surface0 rounded-lg border border-ctp-surface2 space-y-3")], [
                div([class("flex items-center justify-between")], [
                    h2([class("text-xl font-semibold text-ctp-text")], [text("Edit Task")]),
                    button([on_click(|_| Msg::CancelEdit), class("text-ctp-subtext0")], [text("✕")]),
                ]),
                input([
                    r#type("text"),
                    value(&form.task_title),
                    on_input(|event| Msg::SetEditTitle(event.value())),
                    class("w-full px-3 py-2 bg-ctp-surface1 border border-ctp-surface2 rounded-md text-ctp-text focus:outline-none focus:ring-2 focus:ring-ctp-blue"),
                ], []),
                textarea([
                    value(&form.description),
                    on_input(|event| Msg::SetEditDescription(event.value())),
                    class("w-full px-3 py-2 bg-ctp-surface1 border border-ctp-surface2 rounded-md text-ctp-text focus:outline-none focus:ring-2 focus:ring-ctp-blue h-20 resize-y"),
                ], []),
                self.view_priority_select(form.priority, Msg::SetEditPriority),
                div([class("flex items-center gap-2 text-ctp-text")], [
                    input([
                        r#type("checkbox"),
                        checked(form.completed),
                        on_click(|_| Msg::ToggleEditCompleted),
                    ], []),
                    text("Completed"),
                ]),
                div([class("flex gap-2")], [
                    button([
                        on_click(|_| Msg::SaveEdit),
                        class("bg-ctp-green hover:bg-ctp-teal text-ctp-base font-medium px-4 py-2 rounded-md"),
                    ], [text("Save")]),
                    button([
                        on_click(|_| Msg::CancelEdit),
                        class("bg-ctp-overlay0 hover:bg-ctp-overlay1 text-ctp-text font-medium px-4 py-2 rounded-md"),
                    ], [text("Cancel")]),
                ]),
            ]),
        ])
    }
}

fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|body| body.error)
        .unwrap_or_else(|_| format!("Request failed with status {}", status))
}

async fn send(method: &str, url: &str, body: Option<String>) -> Result<Response, String> {
    let opts = RequestInit::new();
    opts.set_method(method);
    if let Some(body) = &body {
        opts.set_body(&JsValue::from_str(body));
    }

    let request =
        Request::new_with_str_and_init(url, &opts).map_err(|_| "Failed to create request")?;
    if body.is_some() {
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(|_| "Failed to set header")?;
    }

    let promise = window()
        .ok_or("No window available")?
        .fetch_with_request(&request);
    let response: Response = JsFuture::from(promise)
        .await
        .map_err(|_| "Failed to send request")?
        .into();
    Ok(response)
}

async fn read_text(response: &Response) -> Result<String, String> {
    let text_promise = response.text().map_err(|_| "Failed to read response")?;
    JsFuture::from(text_promise)
        .await
        .map_err(|_| "Failed to get text")?
        .as_string()
        .ok_or_else(|| "Failed to convert to string".to_string())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, String> {
    let body = read_text(&response).await?;
    if !response.ok() {
        return Err(error_message(response.status(), &body));
    }
    serde_json::from_str(&body).map_err(|e| format!("Failed to parse JSON: {}", e))
}

async fn fetch_tasks(query: TaskListQuery) -> Result<TaskPage, String> {
    let params = UrlSearchParams::new().map_err(|_| "Failed to build query")?;
    for (name, param) in query.query_pairs() {
        params.append(name, &param);
    }
    let url = format!("{}/tasks?{}", API_BASE_URL, String::from(params.to_string()));
    read_json(send("GET", &url, None).await?).await
}

async fn create_task(request: CreateTaskRequest) -> Result<Task, String> {
    let body = serde_json::to_string(&request).map_err(|_| "Failed to serialize request")?;
    let url = format!("{}/tasks", API_BASE_URL);
    read_json(send("POST", &url, Some(body)).await?).await
}

async fn update_task(task_id: i64, request: UpdateTaskRequest) -> Result<Task, String> {
    let body = serde_json::to_string(&request).map_err(|_| "Failed to serialize request")?;
    let url = format!("{}/tasks/{}", API_BASE_URL, task_id);
    read_json(send("PUT", &url, Some(body)).await?).await
}

async fn delete_task(task_id: i64) -> Result<(), String> {
    let url = format!("{}/tasks/{}", API_BASE_URL, task_id);
    let response = send("DELETE", &url, None).await?;
    if response.ok() {
        return Ok(());
    }
    let body = read_text(&response).await.unwrap_or_default();
    Err(error_message(response.status(), &body))
}

async fn sleep_ms(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        if let Some(window) = window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
        }
    });
    let _ = JsFuture::from(promise).await;
}

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    Program::mount_to_body(Model::default());
}
