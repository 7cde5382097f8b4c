use std::path::Path;
use std::sync::Arc;
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use crate::camera::{CameraDevice, CaptureBuffer};
use crate::cli::prompt::{ask, read_secret, show_notice};
use crate::cli::table::render_records;
use crate::common::Config;
use crate::core::{
    manual_override, AttendanceWorkflow, EnrollmentState, EnrollmentWorkflow, Notice, RecordsView,
};
use crate::session::{LoginForm, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Attendance,
    Admin,
}

impl Page {
    fn name(self) -> &'static str {
        match self {
            Page::Attendance => "attendance",
            Page::Admin => "admin",
        }
    }
}

enum Flow {
    Continue,
    Quit,
}

const HELP: &str = "\
Commands:
  login [username]          log in (password is read without echo)
  logout                    end the session
  whoami                    show the current session
  attendance | admin        switch page
  help | quit

Attendance page:
  camera start|stop         acquire or release the camera
  mark                      capture a frame and mark attendance

Admin page (admin session only):
  user create               create an account, then enroll its face
  enroll <image>            enroll a face image for the account just created
  logs                      show recent attendance records
  override <user_id> <note> record attendance manually";

/// Terminal front end: one session, two pages.
pub struct App {
    session: SessionStore,
    login: LoginForm,
    page: Page,
    enrollment: EnrollmentWorkflow,
    attendance: AttendanceWorkflow,
    records: RecordsView,
}

impl App {
    pub fn new(config: &Config, session: SessionStore, camera: Arc<dyn CameraDevice>) -> Self {
        Self {
            login: LoginForm::default(),
            page: Page::Attendance,
            enrollment: EnrollmentWorkflow::new(session.clone()),
            attendance: AttendanceWorkflow::new(session.clone(), camera, config.camera.jpeg_quality),
            records: RecordsView::new(session.clone(), config.attendance.log_limit),
            session,
        }
    }

    /// Leaving a page tears down what it owns: the pending enrollment on
    /// the admin page, the camera on the attendance page.
    pub fn navigate(&mut self, page: Page) {
        if page == self.page {
            return;
        }
        match self.page {
            Page::Admin => self.enrollment.discard(),
            Page::Attendance => self.attendance.stop_camera(),
        }
        tracing::debug!("Page {} -> {}", self.page.name(), page.name());
        self.page = page;
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new()?;
        println!("Facial Attendance System ({})", self.session.gateway().base_url());
        println!("Type `help` for commands.");

        loop {
            let prompt = match self.session.snapshot().principal_name() {
                Some(name) => format!("{}@{}> ", name, self.page.name()),
                None => format!("{}> ", self.page.name()),
            };

            let line = match editor.readline(&prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let _ = editor.add_history_entry(line);

            if let Flow::Quit = self.dispatch(line, &mut editor).await? {
                break;
            }
        }

        self.attendance.stop_camera();
        Ok(())
    }

    async fn dispatch(&mut self, line: &str, editor: &mut DefaultEditor) -> Result<Flow> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match (command, args.as_slice()) {
            ("quit" | "exit", _) => return Ok(Flow::Quit),
            ("help", _) => println!("{}", HELP),
            ("login", rest) => self.log_in(rest.first().copied(), editor).await?,
            ("logout", _) => {
                self.login.logout(&self.session);
                self.enrollment.discard();
                println!("Logged out");
            }
            ("whoami", _) => match self.session.snapshot() {
                s if s.is_authenticated() => println!(
                    "{} ({})",
                    s.principal_name().unwrap_or_default(),
                    s.role().map(|r| r.to_string()).unwrap_or_default()
                ),
                _ => println!("Not logged in"),
            },
            ("attendance", _) => self.navigate(Page::Attendance),
            ("admin", _) => self.navigate(Page::Admin),
            _ => match self.page {
                Page::Attendance => self.attendance_command(command, &args).await,
                Page::Admin => self.admin_command(command, &args, editor).await?,
            },
        }

        Ok(Flow::Continue)
    }

    async fn log_in(&mut self, username: Option<&str>, editor: &mut DefaultEditor) -> Result<()> {
        self.login.username = match username {
            Some(name) => name.to_string(),
            None => match ask(editor, "Username: ")? {
                Some(name) => name,
                None => return Ok(()),
            },
        };
        self.login.password = match read_secret("Password: ") {
            Ok(password) => password,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        match self.login.submit(&self.session).await {
            Ok(session) => show_notice(&Notice::Success(format!(
                "Logged in as {} ({})",
                session.principal_name().unwrap_or_default(),
                session.role().map(|r| r.to_string()).unwrap_or_default()
            ))),
            Err(e) => show_notice(&Notice::failure(&e)),
        }
        Ok(())
    }

    async fn attendance_command(&mut self, command: &str, args: &[&str]) {
        match (command, args) {
            ("camera", ["start"]) => match self.attendance.start_camera() {
                Ok(()) => println!("Camera on"),
                // Device and permission errors surface here, not in the workflow.
                Err(e) => show_notice(&Notice::failure(&e)),
            },
            ("camera", ["stop"]) => {
                self.attendance.stop_camera();
                println!("Camera off");
            }
            ("mark", _) => match self.attendance.capture_and_submit().await {
                Some(notice) => show_notice(&notice),
                None => println!("A submission is already in progress"),
            },
            _ => println!("Unknown command on the attendance page. Type `help`."),
        }
    }

    async fn admin_command(&mut self, command: &str, args: &[&str], editor: &mut DefaultEditor) -> Result<()> {
        // Role is only a hint; the server enforces it again on every call.
        if !self.session.snapshot().is_admin() {
            println!("Admin access required. Log in with an admin account.");
            return Ok(());
        }

        match (command, args) {
            ("user", ["create"]) => {
                let draft = &mut self.enrollment.draft;
                let Some(full_name) = ask(editor, "Full name: ")? else { return Ok(()) };
                let Some(roll_no) = ask(editor, "Roll no: ")? else { return Ok(()) };
                let Some(role) = ask(editor, "Role [STUDENT]: ")? else { return Ok(()) };
                draft.full_name = full_name;
                draft.roll_no = roll_no;
                if !role.is_empty() {
                    match role.parse() {
                        Ok(role) => draft.role = role,
                        Err(e) => {
                            show_notice(&Notice::Failure(e));
                            return Ok(());
                        }
                    }
                }
                draft.password = match read_secret("Password: ") {
                    Ok(password) => password,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => return Ok(()),
                    Err(e) => return Err(e.into()),
                };
                show_notice(&self.enrollment.create_user().await);
            }
            ("enroll", [path]) => {
                match CaptureBuffer::from_file(Path::new(path)) {
                    Ok(image) => self.enrollment.select_image(image),
                    Err(e) => {
                        show_notice(&Notice::failure(&e));
                        return Ok(());
                    }
                }
                show_notice(&self.enrollment.enroll_face().await);
                if let EnrollmentState::Enrolled { user_id, .. } = self.enrollment.state() {
                    tracing::debug!("User {} is ready to mark attendance", user_id);
                }
            }
            ("logs", _) => {
                let notice = self.records.refresh().await;
                if notice.is_success() {
                    print!("{}", render_records(self.records.records()));
                } else {
                    show_notice(&notice);
                }
            }
            ("override", [user_id, note @ ..]) if !note.is_empty() => match user_id.parse::<i64>() {
                Ok(user_id) => show_notice(&manual_override(&self.session, user_id, &note.join(" ")).await),
                Err(_) => println!("User id must be a number"),
            },
            _ => println!("Unknown command on the admin page. Type `help`."),
        }
        Ok(())
    }
}
