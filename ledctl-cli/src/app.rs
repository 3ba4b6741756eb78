//! Application state and logic

use ledctl_core::{ActuatorState, Client, Config, DeviceConfig, Transport};

use crate::input::{Action, Prompt};
use crate::ui;

/// Application result for main loop
pub enum AppResult {
    Continue,
    Quit,
}

/// Main application struct
pub struct App<T> {
    /// Configuration
    pub config: Config,

    /// Device we are talking to
    pub device: DeviceConfig,

    /// Protocol client (owns the session)
    pub client: Client<T>,
}

impl<T: Transport> App<T> {
    pub fn new(config: Config, device: DeviceConfig, client: Client<T>) -> Self {
        Self {
            config,
            device,
            client,
        }
    }

    /// Run one menu action
    pub async fn handle(&self, action: Action, prompt: &mut Prompt) -> anyhow::Result<AppResult> {
        match action {
            Action::Register => self.register(prompt).await?,
            Action::Login => self.login(prompt).await?,
            Action::LedOn => self.set_led(ActuatorState::On).await,
            Action::LedOff => self.set_led(ActuatorState::Off).await,
            Action::LedState => self.led_state().await,
            Action::Dashboard => self.dashboard().await,
            Action::Logs => self.logs().await,
            Action::Logout => self.logout(prompt).await?,
            Action::Exit => return Ok(AppResult::Quit),
        }
        Ok(AppResult::Continue)
    }

    async fn register(&self, prompt: &mut Prompt) -> anyhow::Result<()> {
        println!("\n--- Register New User ---");
        let Some((username, password)) = prompt
            .credentials("Username (min 3 chars): ", "Password (min 3 chars): ")
            .await?
        else {
            if !prompt.interrupted() {
                println!("{}", ui::failure("Username and password are required"));
            }
            return Ok(());
        };

        match self.client.register(&username, &password).await {
            Ok(true) => println!("{}", ui::success(format!("Registered {}", username))),
            Ok(false) => println!("{}", ui::failure("Registration refused by device")),
            Err(e) => println!("{}", ui::error(&e)),
        }
        Ok(())
    }

    async fn login(&self, prompt: &mut Prompt) -> anyhow::Result<()> {
        println!("\n--- Login ---");
        let Some((username, password)) = prompt.credentials("Username: ", "Password: ").await? else {
            if !prompt.interrupted() {
                println!("{}", ui::failure("Username and password are required"));
            }
            return Ok(());
        };

        match self.client.login(&username, &password).await {
            Ok(true) => {
                tracing::info!(user = %username, device = %self.device.name, "Logged in");
                println!("{}", ui::success("Login successful!"));
                println!("  Username: {}", username);
            }
            Ok(false) => println!("{}", ui::failure("Login failed")),
            Err(e) => println!("{}", ui::error(&e)),
        }
        Ok(())
    }

    async fn set_led(&self, state: ActuatorState) {
        match self.client.set_actuator(state).await {
            Ok(true) => println!("{}", ui::success(format!("LED turned {}", state))),
            Ok(false) => println!("{}", ui::failure("Device refused the change")),
            Err(e) => println!("{}", ui::error(&e)),
        }
    }

    async fn led_state(&self) {
        match self.client.actuator_state().await {
            Ok(state) => println!("{}", ui::success(format!("LED is currently: {}", state))),
            Err(e) => println!("{}", ui::error(&e)),
        }
    }

    async fn dashboard(&self) {
        match self.client.dashboard().await {
            Ok(snapshot) => println!("{}", ui::dashboard(&snapshot)),
            Err(e) => println!("{}", ui::error(&e)),
        }
    }

    async fn logs(&self) {
        match self.client.logs().await {
            Ok(entries) => println!("{}", ui::logs(&entries)),
            Err(e) => println!("{}", ui::error(&e)),
        }
    }

    async fn logout(&self, prompt: &mut Prompt) -> anyhow::Result<()> {
        if !self.client.is_authenticated().await {
            println!("{}", ui::failure("Not logged in"));
            return Ok(());
        }

        if self.config.client.confirm_logout && !prompt.confirm("Log out?").await? {
            return Ok(());
        }

        self.client.logout().await;
        tracing::info!("Logged out");
        println!("{}", ui::success("Logged out successfully"));
        Ok(())
    }
}
