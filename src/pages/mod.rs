use crate::api::ApiErrorKind;
use crate::backend::{NoteBackend, SyncErrorKind};
use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonVariant, Card, CardContent, CardDescription, CardFooter,
    CardHeader, CardItem, CardList, CardTitle, Input, Label, Spinner, Textarea,
};
use crate::markdown::render_markdown;
use crate::state::AppContext;
use crate::storage::save_user_to_storage;
use crate::sync::{migrate_anonymous_note, use_unsaved_changes_guard, NoteField, NoteSyncController};
use crate::util::set_document_title;
use leptos::ev;
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::{use_navigate, use_params};
use leptos_router::params::Params;
use wasm_bindgen::JsCast;

#[derive(Params, PartialEq, Clone, Debug)]
pub struct NoteRouteParams {
    pub id: Option<String>,
}

fn force_login(app_state: &AppContext) {
    let mut c = app_state.0.api_client.get_untracked();
    c.logout();
    app_state.0.api_client.set(c);
    app_state.0.current_user.set(None);
    let _ = window().location().set_href("/login");
}

/// The note editing surface: name input, split editor/preview panes, and the
/// autosave engine wired to the given controller.
///
/// Each mounted window owns its view state; nothing about the note is
/// process-global, so two windows can never cross-contaminate state.
#[component]
pub fn NoteWindow(controller: NoteSyncController) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let store = controller.store;
    let controller = StoredValue::new(controller);

    let loading: RwSignal<bool> = RwSignal::new(true);
    // A failed initial fetch blocks the editor: presenting an empty document
    // here would invite the user to overwrite their existing note.
    let load_error: RwSignal<Option<String>> = RwSignal::new(None);

    // Initial load, and a reload whenever the engine is rebound to another
    // backend (the binding generation only moves on a swap).
    Effect::new(move |prev: Option<u64>| {
        let generation = controller.with_value(|c| c.generation());
        if prev == Some(generation) {
            return generation;
        }
        let c = controller.get_value();
        spawn_local(async move {
            let _ = loading.try_set(true);
            match c.load_from_backend().await {
                Ok(_) => {
                    let _ = load_error.try_set(None);
                }
                Err(e) => {
                    if e.kind == SyncErrorKind::Unauthorized {
                        force_login(&app_state);
                        return;
                    }
                    let _ = load_error.try_set(Some(e.to_string()));
                }
            }
            let _ = loading.try_set(false);
        });
        generation
    });

    use_unsaved_changes_guard(store);

    // A write refused for a dead session cannot be retried from here.
    Effect::new(move |_| {
        if store.session_expired.get() {
            force_login(&app_state);
        }
    });

    // Best-effort flush when the page is being hidden/closed; the
    // beforeunload guard above already asked for confirmation if needed.
    {
        let pagehide =
            window_event_listener(ev::pagehide, move |_ev: web_sys::PageTransitionEvent| {
                controller.with_value(|c| c.flush_all());
            });
        on_cleanup(move || pagehide.remove());
    }

    // Flush on teardown: a pending quiet period at unmount still writes.
    on_cleanup(move || {
        let _ = controller.try_with_value(|c| c.flush_all());
    });

    // Browser tab title follows the note name.
    Effect::new(move |_| {
        set_document_title(&store.value(NoteField::Name).get());
    });

    // Keep the editing surface as wide as the rendered preview so the two
    // panes scroll in step. Purely cosmetic; never persisted.
    let preview_ref: NodeRef<html::Div> = NodeRef::new();
    let editor_ref: NodeRef<html::Textarea> = NodeRef::new();

    Effect::new(move |_| {
        store.value(NoteField::Content).track();
        if let Some(el) = preview_ref.get_untracked() {
            store.preview_width.set(el.scroll_width() as f64);
        }
    });

    Effect::new(move |_| {
        let w = store.preview_width.get();
        if w <= 0.0 {
            return;
        }
        if let Some(el) = editor_ref.get_untracked() {
            // Inherent accessor; the prelude has a same-named styling helper
            // on the element type.
            let style = web_sys::HtmlElement::style(&el);
            let _ = style.set_property("width", &format!("{}px", w));
        }
    });

    let status = move || {
        if store.any_saving() {
            "Saving…".to_string()
        } else if store.any_dirty() {
            match store.save_error.get() {
                Some(e) => e,
                None => "Unsaved changes".to_string(),
            }
        } else {
            "Your note is auto-saved. Try to refresh.".to_string()
        }
    };

    view! {
        <main class="flex h-screen flex-col">
            <Show
                when=move || !loading.get()
                fallback=|| view! {
                    <div class="flex h-full items-center justify-center text-5xl font-bold">
                        "mnote"
                    </div>
                }
            >
                {move || {
                    if let Some(e) = load_error.get() {
                        // Blocking error state; no editor underneath.
                        return view! {
                            <div class="flex h-full items-center justify-center px-4">
                                <Alert class="max-w-md border-destructive/30">
                                    <AlertDescription class="text-destructive">
                                        {format!("Could not load this note: {}", e)}
                                    </AlertDescription>
                                </Alert>
                            </div>
                        }
                        .into_any();
                    }

                    view! {
                        <div class="flex items-center justify-between border-b px-4 py-2">
                            <div class="flex min-w-0 flex-1 items-center gap-2">
                                <a href="/" class="text-xl font-bold leading-none">"mnote"</a>
                                <span class="leading-none text-muted-foreground">"|"</span>
                                <Input
                                    bind_value=store.value(NoteField::Name)
                                    class="h-7 max-w-sm border-none px-1 text-base shadow-none"
                                    placeholder="Untitled"
                                    on:input=move |ev: web_sys::Event| {
                                        if let Some(t) = ev
                                            .target()
                                            .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
                                        {
                                            controller.with_value(|c| c.set(NoteField::Name, &t.value()));
                                        }
                                    }
                                />
                            </div>
                            <p class="text-sm underline opacity-50">{status}</p>
                        </div>

                        <div class="flex grow overflow-y-hidden">
                            <div class="w-1/2 overflow-auto border-r p-4">
                                <Textarea
                                    bind_value=store.value(NoteField::Content)
                                    class="min-h-full min-w-full resize-none whitespace-pre border-none shadow-none"
                                    placeholder="Start typing your note here!"
                                    autofocus=true
                                    node_ref=editor_ref
                                    on:input=move |ev: web_sys::Event| {
                                        if let Some(t) = ev
                                            .target()
                                            .and_then(|t| t.dyn_into::<web_sys::HtmlTextAreaElement>().ok())
                                        {
                                            controller.with_value(|c| c.set(NoteField::Content, &t.value()));
                                        }
                                    }
                                />
                            </div>
                            <div class="w-1/2 overflow-auto bg-muted/30 p-4">
                                <div
                                    node_ref=preview_ref
                                    class="prose"
                                    inner_html=move || render_markdown(&store.value(NoteField::Content).get())
                                />
                            </div>
                        </div>
                    }
                    .into_any()
                }}
            </Show>
        </main>
    }
}

/// Anonymous note at `/`. A signed-in user is sent to their dashboard.
#[component]
pub fn LocalNotePage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let is_authenticated = move || app_state.0.api_client.get().is_authenticated();

    Effect::new(move |_| {
        if is_authenticated() {
            let _ = window().location().set_href("/dashboard");
        }
    });

    view! {
        <Show
            when=move || !is_authenticated()
            fallback=|| view! {
                <div class="flex h-screen items-center justify-center text-5xl font-bold">
                    "mnote"
                </div>
            }
        >
            <NoteWindow controller=NoteSyncController::new(NoteBackend::local()) />
        </Show>
    }
}

/// Authenticated note at `/note/:id`.
#[component]
pub fn NotePage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let params = use_params::<NoteRouteParams>();

    // Params access happens inside a reactive tracking context.
    let note_id = move || params.get().ok().and_then(|p| p.id).unwrap_or_default();

    Effect::new(move |_| {
        if !app_state.0.api_client.get().is_authenticated() {
            let _ = window().location().set_href("/");
        }
    });

    // Dedup to a bool: switching between two notes must not remount the
    // window. The rebind effect below swaps the backend in place instead.
    let ready = Memo::new(move |_| {
        !note_id().trim().is_empty() && app_state.0.api_client.get().is_authenticated()
    });

    view! {
        {move || {
            if !ready.get() {
                return view! {
                    <div class="flex h-screen items-center justify-center text-5xl font-bold">
                        "mnote"
                    </div>
                }
                .into_any();
            }

            let api = app_state.0.api_client.get_untracked();
            let id = params
                .get_untracked()
                .ok()
                .and_then(|p| p.id)
                .unwrap_or_default();
            let controller = NoteSyncController::new(NoteBackend::remote(api, id));
            let controller_sv = StoredValue::new(controller.clone());

            // Navigating between notes rebinds the engine: pending edits
            // flush against the outgoing note, then the window reloads.
            Effect::new(move |prev: Option<String>| {
                let id = note_id();
                if let Some(prev_id) = &prev {
                    if *prev_id != id && !id.trim().is_empty() {
                        let api = app_state.0.api_client.get_untracked();
                        controller_sv
                            .get_value()
                            .swap_backend(NoteBackend::remote(api, id.clone()));
                    }
                }
                id
            });

            view! { <NoteWindow controller=controller /> }.into_any()
        }}
    }
}

#[component]
pub fn DashboardPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let navigate = StoredValue::new(use_navigate());

    let creating: RwSignal<bool> = RwSignal::new(false);

    Effect::new(move |_| {
        if !app_state.0.api_client.get().is_authenticated() {
            let _ = window().location().set_href("/login");
        }
    });

    let load_notes = move || {
        if app_state.0.notes_loading.get_untracked() {
            return;
        }

        // Stale-response protection.
        let req_id = app_state
            .0
            .notes_request_id
            .get_untracked()
            .saturating_add(1);
        app_state.0.notes_request_id.set(req_id);

        app_state.0.notes_loading.set(true);
        app_state.0.notes_error.set(None);

        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            let result = api_client.list_notes().await;

            if app_state.0.notes_request_id.get_untracked() != req_id {
                return;
            }

            match result {
                Ok(notes) => app_state.0.notes.set(notes),
                Err(e) => {
                    if e.kind == ApiErrorKind::Unauthorized {
                        force_login(&app_state);
                    } else {
                        app_state.0.notes_error.set(Some(e.to_string()));
                    }
                }
            }
            app_state.0.notes_loading.set(false);
        });
    };

    Effect::new(move |_| {
        load_notes();
    });

    let on_create = move |_| {
        if creating.get_untracked() {
            return;
        }
        creating.set(true);

        let api_client = app_state.0.api_client.get_untracked();
        let navigate2 = navigate;
        spawn_local(async move {
            match api_client.create_note("Untitled", "").await {
                Ok(note) => {
                    app_state.0.notes.update(|xs| xs.insert(0, note.clone()));
                    navigate2.with_value(|nav| {
                        nav(
                            &format!("/note/{}", note.id),
                            leptos_router::NavigateOptions::default(),
                        );
                    });
                }
                Err(e) => {
                    if e.kind == ApiErrorKind::Unauthorized {
                        force_login(&app_state);
                    } else {
                        app_state.0.notes_error.set(Some(e.to_string()));
                    }
                }
            }
            creating.set(false);
        });
    };

    let on_logout = move |_| {
        force_login(&app_state);
    };

    let notes = app_state.0.notes;
    let loading = app_state.0.notes_loading;
    let error = app_state.0.notes_error;

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto w-full max-w-[720px] px-4 py-8">
                <div class="mb-4 flex items-center justify-between">
                    <div class="space-y-1">
                        <h1 class="text-xl font-semibold">"mnote"</h1>
                        <p class="text-xs text-muted-foreground">"Your notes"</p>
                    </div>

                    <div class="flex items-center gap-2">
                        <Button attr:disabled=move || creating.get() on:click=on_create>
                            <span class="inline-flex items-center gap-2">
                                <Show when=move || creating.get() fallback=|| ().into_view()>
                                    <Spinner />
                                </Show>
                                {move || if creating.get() { "Creating…" } else { "New note" }}
                            </span>
                        </Button>

                        <Button variant=ButtonVariant::Outline on:click=on_logout>
                            "Sign out"
                        </Button>
                    </div>
                </div>

                <Show when=move || error.get().is_some() fallback=|| ().into_view()>
                    {move || {
                        error.get().map(|e| view! {
                            <Alert class="border-destructive/30">
                                <AlertDescription class="text-destructive">{e}</AlertDescription>
                            </Alert>
                        })
                    }}
                </Show>

                <Card>
                    <CardHeader>
                        <CardTitle>"Notes"</CardTitle>
                        <CardDescription>
                            {move || format!("{} total", notes.get().len())}
                        </CardDescription>
                    </CardHeader>

                    <CardContent>
                        <Show
                            when=move || !notes.get().is_empty()
                            fallback=move || view! {
                                <div class="text-xs text-muted-foreground">
                                    {move || if loading.get() {
                                        "Loading notes…"
                                    } else {
                                        "No notes yet."
                                    }}
                                </div>
                            }
                        >
                            <CardList>
                                {move || {
                                    notes
                                        .get()
                                        .into_iter()
                                        .map(|note| {
                                            let href = format!("/note/{}", note.id);
                                            let name = if note.name.trim().is_empty() {
                                                "Untitled".to_string()
                                            } else {
                                                note.name.clone()
                                            };
                                            view! {
                                                <CardItem class="rounded-md border">
                                                    <a href=href class="flex w-full flex-col items-start gap-1 px-4 py-3">
                                                        <div class="text-sm font-medium">{name}</div>
                                                        <div class="text-xs text-muted-foreground">{note.updated_at}</div>
                                                    </a>
                                                </CardItem>
                                            }
                                        })
                                        .collect_view()
                                }}
                            </CardList>
                        </Show>
                    </CardContent>
                </Card>
            </div>
        </div>
    }
}

#[component]
pub fn LoginPage() -> impl IntoView {
    let email: RwSignal<String> = RwSignal::new(String::new());
    let password: RwSignal<String> = RwSignal::new(String::new());
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let loading: RwSignal<bool> = RwSignal::new(false);

    let app_state = expect_context::<AppContext>();

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();

        let email_val = email.get();
        let password_val = password.get();
        let mut api_client = app_state.0.api_client.get_untracked();

        loading.set(true);
        error.set(None);

        spawn_local(async move {
            match api_client.login(&email_val, &password_val).await {
                Ok(response) => {
                    api_client.set_token(response.token);
                    api_client.save_to_storage();
                    save_user_to_storage(&response.account);

                    // First sign-in migrates the anonymous note into the
                    // account; anonymous storage is cleared only after the
                    // remote copy is confirmed, so a failure here keeps the
                    // local note intact for the next attempt.
                    if let Err(e) = migrate_anonymous_note(&api_client).await {
                        web_sys::console::warn_1(
                            &format!("anonymous note migration failed: {e}").into(),
                        );
                    }

                    app_state.0.api_client.set(api_client);
                    app_state.0.current_user.set(Some(response.account));
                    let _ = window().location().set_href("/dashboard");
                }
                Err(e) => {
                    error.set(Some(e.to_string()));
                }
            }
            loading.set(false);
        });
    };

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex min-h-screen w-full max-w-md flex-col justify-center px-4 py-12">
                <div class="mb-6">
                    <a href="/" class="text-sm font-medium text-foreground">"mnote"</a>
                    <div class="text-xs text-muted-foreground">"Take some notes."</div>
                </div>

                <Card>
                    <CardHeader>
                        <CardTitle class="text-xl">"Sign in"</CardTitle>
                        <CardDescription>
                            "Welcome back. Your anonymous note moves into your account on sign-in."
                        </CardDescription>
                    </CardHeader>

                    <CardContent>
                        <form class="flex flex-col gap-4" on:submit=on_submit>
                            <div class="flex flex-col gap-2">
                                <Label html_for="email">"Email"</Label>
                                <Input
                                    id="email"
                                    r#type="email"
                                    placeholder="you@example.com"
                                    bind_value=email
                                    required=true
                                />
                            </div>

                            <div class="flex flex-col gap-2">
                                <Label html_for="password">"Password"</Label>
                                <Input
                                    id="password"
                                    r#type="password"
                                    placeholder="••••••••"
                                    bind_value=password
                                    required=true
                                />
                            </div>

                            <Show
                                when=move || error.get().is_some()
                                fallback=|| ().into_view()
                            >
                                {move || {
                                    error.get().map(|e| view! {
                                        <Alert class="border-destructive/30">
                                            <AlertDescription class="text-destructive">{e}</AlertDescription>
                                        </Alert>
                                    })
                                }}
                            </Show>

                            <Button
                                class="w-full"
                                attr:disabled=move || loading.get()
                            >
                                <span class="inline-flex items-center gap-2">
                                    <Show when=move || loading.get() fallback=|| ().into_view()>
                                        <Spinner />
                                    </Show>
                                    {move || if loading.get() { "Signing in..." } else { "Sign in" }}
                                </span>
                            </Button>
                        </form>
                    </CardContent>

                    <CardFooter class="justify-between">
                        <div class="text-xs text-muted-foreground">
                            "No account? "
                            <a class="text-primary underline underline-offset-4" href="/signup">"Create one"</a>
                        </div>
                    </CardFooter>
                </Card>
            </div>
        </div>
    }
}

#[component]
pub fn RegistrationPage() -> impl IntoView {
    let email: RwSignal<String> = RwSignal::new(String::new());
    let username: RwSignal<String> = RwSignal::new(String::new());
    let password: RwSignal<String> = RwSignal::new(String::new());
    let confirm_password: RwSignal<String> = RwSignal::new(String::new());
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let loading: RwSignal<bool> = RwSignal::new(false);
    let success: RwSignal<bool> = RwSignal::new(false);

    let app_state = expect_context::<AppContext>();

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();

        let email_val = email.get();
        let username_val = username.get();
        let password_val = password.get();
        let confirm_password_val = confirm_password.get();
        let api_client = app_state.0.api_client.get_untracked();

        if password_val != confirm_password_val {
            error.set(Some("Passwords do not match".to_string()));
            return;
        }

        if password_val.len() < 6 {
            error.set(Some("Password must be at least 6 characters".to_string()));
            return;
        }

        loading.set(true);
        error.set(None);

        spawn_local(async move {
            match api_client
                .signup(&email_val, &username_val, &password_val)
                .await
            {
                Ok(_response) => {
                    // Backend returns a token on signup; we keep UX simple
                    // and ask the user to sign in.
                    success.set(true);
                }
                Err(e) => {
                    error.set(Some(e.to_string()));
                }
            }
            loading.set(false);
        });
    };

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex min-h-screen w-full max-w-md flex-col justify-center px-4 py-12">
                <div class="mb-6">
                    <a href="/" class="text-sm font-medium text-foreground">"mnote"</a>
                    <div class="text-xs text-muted-foreground">"Create your account."</div>
                </div>

                <Card>
                    <CardHeader>
                        <CardTitle class="text-xl">"Create account"</CardTitle>
                        <CardDescription>
                            "Sign up to keep your notes across devices."
                        </CardDescription>
                    </CardHeader>

                    <CardContent>
                        <Show
                            when=move || !success.get()
                            fallback=move || view! {
                                <Alert>
                                    <AlertDescription>
                                        "Account created. You can now "
                                        <a class="text-primary underline underline-offset-4" href="/login">"sign in"</a>
                                        "."
                                    </AlertDescription>
                                </Alert>
                            }
                        >
                            <form class="flex flex-col gap-4" on:submit=on_submit>
                                <div class="flex flex-col gap-2">
                                    <Label html_for="username">"Username"</Label>
                                    <Input
                                        id="username"
                                        r#type="text"
                                        placeholder="yourname"
                                        bind_value=username
                                        required=true
                                    />
                                </div>

                                <div class="flex flex-col gap-2">
                                    <Label html_for="email">"Email"</Label>
                                    <Input
                                        id="email"
                                        r#type="email"
                                        placeholder="you@example.com"
                                        bind_value=email
                                        required=true
                                    />
                                </div>

                                <div class="flex flex-col gap-2">
                                    <Label html_for="password">"Password"</Label>
                                    <Input
                                        id="password"
                                        r#type="password"
                                        placeholder="••••••••"
                                        bind_value=password
                                        required=true
                                    />
                                </div>

                                <div class="flex flex-col gap-2">
                                    <Label html_for="confirm_password">"Confirm password"</Label>
                                    <Input
                                        id="confirm_password"
                                        r#type="password"
                                        placeholder="••••••••"
                                        bind_value=confirm_password
                                        required=true
                                    />
                                </div>

                                <Show when=move || error.get().is_some() fallback=|| ().into_view()>
                                    {move || {
                                        error.get().map(|e| view! {
                                            <Alert class="border-destructive/30">
                                                <AlertDescription class="text-destructive">{e}</AlertDescription>
                                            </Alert>
                                        })
                                    }}
                                </Show>

                                <Button class="w-full" attr:disabled=move || loading.get()>
                                    <span class="inline-flex items-center gap-2">
                                        <Show when=move || loading.get() fallback=|| ().into_view()>
                                            <Spinner />
                                        </Show>
                                        {move || if loading.get() { "Creating..." } else { "Create account" }}
                                    </span>
                                </Button>
                            </form>
                        </Show>
                    </CardContent>

                    <CardFooter class="justify-between">
                        <div class="text-xs text-muted-foreground">
                            "Already have an account? "
                            <a class="text-primary underline underline-offset-4" href="/login">"Sign in"</a>
                        </div>
                    </CardFooter>
                </Card>
            </div>
        </div>
    }
}
