/// A message a caller wants published.
///
/// Built once per logical publish and never mutated afterwards; every
/// attempt derives its request envelope from the same intent.
///
/// # Example
///
/// ```rust
/// use popsub_delivery::delivery::MessageIntent;
///
/// let intent = MessageIntent::new("traffic", "Road closed at 5th")
///     .with_radius(2)
///     .with_lifetime_minutes(30)
///     .with_location(45.07, 7.68)
///     .with_title("Closure");
/// assert_eq!(intent.title.as_deref(), Some("Closure"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MessageIntent {
    pub body: String,
    pub topic: String,
    /// Geofence radius in kilometres around the publisher's location.
    pub radius: u32,
    /// Time-to-live in minutes.
    pub lifetime_minutes: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub title: Option<String>,
}

impl MessageIntent {
    pub fn new(topic: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            topic: topic.into(),
            radius: 0,
            lifetime_minutes: 0,
            latitude: 0.0,
            longitude: 0.0,
            title: None,
        }
    }

    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_lifetime_minutes(mut self, minutes: u32) -> Self {
        self.lifetime_minutes = minutes;
        self
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
