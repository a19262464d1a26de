//! Student registration: capture face images, validate the profile, then
//! create the student and enroll each image.

use std::fmt;

use crate::api::ApiError;
use crate::camera::{CameraError, CameraSession, EncodedImage, FeedInfo};
use crate::models::{NewStudent, StudentProfile};
use crate::services::Services;
use crate::store::StoreError;

/// Minimum number of captured images before a registration can be submitted.
pub const MIN_IMAGES: usize = 3;

/// A required field of the registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Branch,
    Year,
    RollNumber,
    Email,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::Name,
        FormField::Branch,
        FormField::Year,
        FormField::RollNumber,
        FormField::Email,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Name => "Name",
            FormField::Branch => "Branch",
            FormField::Year => "Year",
            FormField::RollNumber => "Roll number",
            FormField::Email => "Email",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a registration was not submitted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(FormField),

    #[error("Year must be a positive whole number, got '{0}'")]
    InvalidYear(String),

    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    #[error("Capture at least {required} face images ({captured} captured)")]
    NotEnoughImages { captured: usize, required: usize },
}

/// Errors ending a registration attempt.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error("Failed to create student: {0}")]
    ProfileCreation(#[from] StoreError),
}

/// Profile fields as typed by the operator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationForm {
    pub name: String,
    pub branch: String,
    pub year: String,
    pub roll_number: String,
    pub email: String,
}

impl RegistrationForm {
    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name,
            FormField::Branch => &self.branch,
            FormField::Year => &self.year,
            FormField::RollNumber => &self.roll_number,
            FormField::Email => &self.email,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::Name => self.name = value,
            FormField::Branch => self.branch = value,
            FormField::Year => self.year = value,
            FormField::RollNumber => self.roll_number = value,
            FormField::Email => self.email = value,
        }
    }

    /// Check required fields and the email pattern, producing the insert payload.
    pub fn validate(&self) -> Result<NewStudent, ValidationError> {
        if let Some(field) = FormField::ALL
            .into_iter()
            .find(|f| self.value(*f).trim().is_empty())
        {
            return Err(ValidationError::MissingField(field));
        }

        let year_text = self.year.trim();
        let year = year_text
            .parse::<u32>()
            .ok()
            .filter(|y| *y > 0)
            .ok_or_else(|| ValidationError::InvalidYear(year_text.to_string()))?;

        let email = self.email.trim();
        if !is_valid_email(email) {
            return Err(ValidationError::InvalidEmail(email.to_string()));
        }

        Ok(NewStudent {
            name: self.name.trim().to_string(),
            branch: self.branch.trim().to_string(),
            year,
            roll_number: self.roll_number.trim().to_string(),
            email: email.to_string(),
        })
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Basic `local@domain.tld` shape check: no whitespace, exactly one `@`,
/// and a dot inside the domain with text on both sides.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let clean = |s: &str| !s.is_empty() && !s.contains('@') && !s.chars().any(char::is_whitespace);
    if !clean(local) || !clean(domain) {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Encoded frames collected for one registration, in capture order.
#[derive(Debug, Clone, Default)]
pub struct CapturedImages {
    images: Vec<EncodedImage>,
}

impl CapturedImages {
    pub fn push(&mut self, image: EncodedImage) -> usize {
        self.images.push(image);
        self.images.len()
    }

    /// Drop the image at `index`, keeping the order of the rest.
    pub fn remove(&mut self, index: usize) -> Option<EncodedImage> {
        (index < self.images.len()).then(|| self.images.remove(index))
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EncodedImage> {
        self.images.iter()
    }
}

/// Where the registration flow currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationState {
    Idle,
    Capturing,
    Validating,
    Submitting,
    Success { accepted: usize, attempted: usize },
    Failed { message: String },
}

/// An image the backend did not enroll.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFailure {
    /// Position in capture order
    pub index: usize,
    pub message: String,
}

/// Result of a completed registration.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationOutcome {
    pub student: StudentProfile,
    /// Images the backend enrolled
    pub accepted: usize,
    /// Images submitted
    pub attempted: usize,
    pub failures: Vec<ImageFailure>,
}

/// The registration view: form, captured images and the camera they come from.
#[derive(Debug)]
pub struct RegistrationFlow {
    services: Services,
    camera: CameraSession,
    form: RegistrationForm,
    images: CapturedImages,
    state: RegistrationState,
}

impl RegistrationFlow {
    pub fn new(services: Services, camera: CameraSession) -> Self {
        Self {
            services,
            camera,
            form: RegistrationForm::default(),
            images: CapturedImages::default(),
            state: RegistrationState::Idle,
        }
    }

    pub fn form(&self) -> &RegistrationForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut RegistrationForm {
        &mut self.form
    }

    pub fn images(&self) -> &CapturedImages {
        &self.images
    }

    pub fn state(&self) -> &RegistrationState {
        &self.state
    }

    pub fn camera(&self) -> &CameraSession {
        &self.camera
    }

    pub fn start_camera(&mut self) -> Result<FeedInfo, CameraError> {
        let feed = self.camera.start()?;
        self.state = RegistrationState::Capturing;
        Ok(feed)
    }

    pub fn stop_camera(&mut self) {
        self.camera.stop();
    }

    /// Capture a still frame and append it. Returns the new image count.
    pub fn capture(&mut self) -> Result<usize, CameraError> {
        let image = self.camera.capture_frame()?;
        self.state = RegistrationState::Capturing;
        Ok(self.images.push(image))
    }

    pub fn remove_image(&mut self, index: usize) -> Option<EncodedImage> {
        self.images.remove(index)
    }

    fn validate(&self) -> Result<NewStudent, ValidationError> {
        let student = self.form.validate()?;
        if self.images.len() < MIN_IMAGES {
            return Err(ValidationError::NotEnoughImages {
                captured: self.images.len(),
                required: MIN_IMAGES,
            });
        }
        Ok(student)
    }

    /// Validate, create the student, then enroll every captured image in order.
    ///
    /// A failed profile insert aborts before any enrollment and keeps the
    /// form and images for a retry. Enrollment failures only lower the
    /// accepted count. On success the view is reset.
    pub async fn submit(&mut self) -> Result<RegistrationOutcome, RegistrationError> {
        self.state = RegistrationState::Validating;
        let student = match self.validate() {
            Ok(student) => student,
            Err(e) => {
                self.state = RegistrationState::Capturing;
                return Err(e.into());
            }
        };

        self.state = RegistrationState::Submitting;
        let profile = match self.services.store.create_student(&student).await {
            Ok(profile) => profile,
            Err(e) => {
                log::error!("Student creation failed for {}: {}", student.roll_number, e);
                self.state = RegistrationState::Failed {
                    message: e.to_string(),
                };
                return Err(RegistrationError::ProfileCreation(e));
            }
        };

        let mut accepted = 0;
        let mut failures = Vec::new();
        for (index, image) in self.images.iter().enumerate() {
            let result = self
                .services
                .recognition
                .register_face(image, &profile.roll_number)
                .await;
            match enrollment_failure(result) {
                None => accepted += 1,
                Some(message) => {
                    log::warn!("Image {} not enrolled for {}: {}", index + 1, profile.roll_number, message);
                    failures.push(ImageFailure { index, message });
                }
            }
        }

        let attempted = self.images.len();
        log::info!(
            "Registered {} with {}/{} face image(s)",
            profile.roll_number,
            accepted,
            attempted
        );

        self.form.clear();
        self.images.clear();
        self.camera.stop();
        self.state = RegistrationState::Success { accepted, attempted };

        Ok(RegistrationOutcome {
            student: profile,
            accepted,
            attempted,
            failures,
        })
    }

    /// Clear everything and release the camera.
    pub fn reset(&mut self) {
        self.form.clear();
        self.images.clear();
        self.camera.stop();
        self.state = RegistrationState::Idle;
    }
}

fn enrollment_failure(
    result: Result<crate::api::EnrollmentResponse, ApiError>,
) -> Option<String> {
    match result {
        Ok(response) if response.is_accepted() => None,
        Ok(response) => Some(
            response
                .message
                .unwrap_or_else(|| format!("backend answered '{}'", response.status)),
        ),
        Err(e) => Some(e.to_string()),
    }
}
