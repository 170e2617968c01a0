use std::fmt;

/// Lines sent to every client as soon as it connects. The last one announces
/// the hull area the watcher reports crossings of.
pub(crate) fn greeting(threshold: f64) -> [String; 3] {
    [
        "Convex Hull Server Ready".to_owned(),
        "Commands: Newgraph n, CH, Newpoint x,y, Removepoint x,y, exit".to_owned(),
        format!("Note: Server monitors for CH area >= {threshold} square units"),
    ]
}

/// One line of server output, rendered without its trailing newline.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reply {
    EnterPoints(usize),
    PointAccepted(usize),
    GraphCreated(usize),
    Area(f64),
    PointAdded,
    PointRemoved,
    PointNotFound,
    Queued(usize),
    Goodbye,
    Error(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnterPoints(count) => write!(formatter, "Enter {count} points (x,y):"),
            Self::PointAccepted(index) => write!(formatter, "Point {index} accepted"),
            Self::GraphCreated(count) => write!(formatter, "Graph created with {count} points"),
            Self::Area(area) => write!(formatter, "{area:.1}"),
            Self::PointAdded => formatter.write_str("Point added"),
            Self::PointRemoved => formatter.write_str("Point removed"),
            Self::PointNotFound => formatter.write_str("Point not found"),
            Self::Queued(position) => write!(formatter, "Command queued (position {position})"),
            Self::Goodbye => formatter.write_str("Goodbye!"),
            Self::Error(message) => write!(formatter, "Error: {message}"),
        }
    }
}
