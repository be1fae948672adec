use herald_expr::EventData;

/// Something that just happened and may satisfy campaign triggers.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// A new user session started.
    NewSession,
    /// A campaign set became active inside the current session.
    CampaignsLoaded,
    /// The campaign set was replaced by a fresher definition.
    CampaignsRefreshed,
    /// An analytics event was tracked.
    Event(EventData),
    /// A user attribute or tag collection changed.
    AttributeChanged,
}

impl Signal {
    pub fn event(&self) -> Option<&EventData> {
        match self {
            Signal::Event(e) => Some(e),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Signal::NewSession => "new_session",
            Signal::CampaignsLoaded => "campaigns_loaded",
            Signal::CampaignsRefreshed => "campaigns_refreshed",
            Signal::Event(_) => "event",
            Signal::AttributeChanged => "attribute_changed",
        }
    }
}
