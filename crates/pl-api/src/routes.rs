//! API routes

use axum::{
    routing::{delete, get, post, put},
    Extension, Router,
};
use pl_core::DocumentKind;

use crate::extractors::AppState;
use crate::handlers::{
    analytics, auth, documents, expenses, members, partners, products, projects, task_items,
    tasks, timesheets, users,
};

/// Create the complete API router
pub fn router() -> Router<AppState> {
    let mut router = Router::new()
        .merge(auth_router())
        .nest("/users", users_router())
        .nest("/projects", projects_router())
        .nest("/tasks", tasks_router())
        .nest("/timesheets", timesheets_router())
        .nest("/expenses", expenses_router())
        .nest("/partners", partners_router())
        .nest("/products", products_router())
        .nest("/analytics", analytics_router());

    for kind in DocumentKind::ALL {
        router = router.nest(&document_path(kind), documents_router(kind));
    }
    router
}

/// `/sales-orders`, `/purchase-orders`, `/customer-invoices`, `/vendor-bills`
fn document_path(kind: DocumentKind) -> String {
    format!("/{}", kind.table().replace('_', "-"))
}

fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/profile", get(auth::profile))
}

fn users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users))
        .route(
            "/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/:id/projects", get(users::user_projects))
        .route("/:id/tasks", get(users::user_tasks))
        .route("/:id/expenses", get(users::user_expenses))
        .route("/:id/timesheets", get(users::user_timesheets))
}

fn projects_router() -> Router<AppState> {
    Router::new()
        .route("/", get(projects::list_projects).post(projects::create_project))
        .route(
            "/:id",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/:id/members",
            get(members::list_members).post(members::add_member),
        )
        .route(
            "/:id/members/:member_id",
            delete(members::remove_member),
        )
        .route(
            "/:id/tasks",
            get(tasks::list_project_tasks).post(tasks::create_task),
        )
        .route(
            "/:id/timesheets",
            get(timesheets::list_project_timesheets).post(timesheets::create_timesheet),
        )
        .route(
            "/:id/expenses",
            get(expenses::list_project_expenses).post(expenses::create_expense),
        )
}

fn tasks_router() -> Router<AppState> {
    Router::new()
        .route(
            "/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/:id/assignments", post(task_items::assign_task))
        .route(
            "/:id/assignments/:assignment_id",
            delete(task_items::unassign_task),
        )
        .route(
            "/:id/comments",
            get(task_items::list_comments).post(task_items::add_comment),
        )
        .route(
            "/:id/comments/:comment_id",
            delete(task_items::delete_comment),
        )
        .route(
            "/:id/attachments",
            get(task_items::list_attachments).post(task_items::add_attachment),
        )
        .route(
            "/:id/attachments/:attachment_id",
            delete(task_items::delete_attachment),
        )
}

fn timesheets_router() -> Router<AppState> {
    Router::new().route(
        "/:id",
        get(timesheets::get_timesheet)
            .put(timesheets::update_timesheet)
            .delete(timesheets::delete_timesheet),
    )
}

fn expenses_router() -> Router<AppState> {
    Router::new().route(
        "/:id",
        get(expenses::get_expense)
            .put(expenses::update_expense)
            .delete(expenses::delete_expense),
    )
}

fn partners_router() -> Router<AppState> {
    Router::new()
        .route("/", get(partners::list_partners).post(partners::create_partner))
        .route(
            "/:id",
            get(partners::get_partner)
                .put(partners::update_partner)
                .delete(partners::delete_partner),
        )
}

fn products_router() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list_products).post(products::create_product))
        .route(
            "/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
}

/// One route set per document kind; handlers read the kind from the extension
fn documents_router(kind: DocumentKind) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::create_document),
        )
        .route(
            "/:id",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
        .route("/:id/lines", post(documents::add_line))
        .route(
            "/:id/lines/:line_id",
            put(documents::update_line).delete(documents::delete_line),
        )
        .layer(Extension(kind))
}

fn analytics_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(analytics::dashboard))
        .route("/projects/overview", get(analytics::projects_overview))
        .route("/projects/timeline", get(analytics::projects_timeline))
        .route("/projects/:id/summary", get(analytics::project_summary))
        .route("/tasks/overview", get(analytics::tasks_overview))
        .route("/tasks/user/:id", get(analytics::user_tasks))
        .route(
            "/tasks/project/:id/timeline",
            get(analytics::project_task_timeline),
        )
        .route("/timesheets/overview", get(analytics::timesheets_overview))
        .route("/timesheets/user/:id", get(analytics::user_timesheets))
        .route("/timesheets/project/:id", get(analytics::project_timesheets))
        .route("/expenses/overview", get(analytics::expenses_overview))
        .route("/expenses/user/:id", get(analytics::user_expenses))
        .route("/expenses/project/:id", get(analytics::project_expenses))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_paths() {
        let paths: Vec<String> = DocumentKind::ALL.into_iter().map(document_path).collect();
        assert_eq!(
            paths,
            [
                "/sales-orders",
                "/purchase-orders",
                "/customer-invoices",
                "/vendor-bills"
            ]
        );
    }
}
