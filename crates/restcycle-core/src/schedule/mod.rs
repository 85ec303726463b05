mod work_hours;

pub use work_hours::WorkHours;
