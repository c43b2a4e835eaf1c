#[derive(Debug, Clone, Copy)]
pub struct Tag {
    pub key: &'static str,
    pub metric: &'static str,
    pub unit: &'static str,
}

pub const TEMPERATURE_C: Tag = Tag {
    key: "temperature",
    metric: "plcsim_temperature_celsius",
    unit: "°C",
};

pub const PRESSURE_PSI: Tag = Tag {
    key: "pressure",
    metric: "plcsim_pressure_psi",
    unit: "PSI",
};

pub const FLOW_RATE_LPM: Tag = Tag {
    key: "flow_rate",
    metric: "plcsim_flow_rate_lpm",
    unit: "L/min",
};

pub const TANK_LEVEL_PCT: Tag = Tag {
    key: "tank_level",
    metric: "plcsim_tank_level_percent",
    unit: "%",
};

pub const PUMP_RUNNING: Tag = Tag {
    key: "pump_running",
    metric: "plcsim_pump_running",
    unit: "",
};

pub const VALVE_OPEN: Tag = Tag {
    key: "valve_open",
    metric: "plcsim_valve_open",
    unit: "",
};

pub const HEATER_ON: Tag = Tag {
    key: "heater_on",
    metric: "plcsim_heater_on",
    unit: "",
};

pub const ALARM_WORD: Tag = Tag {
    key: "alarm_word",
    metric: "plcsim_alarm_word",
    unit: "",
};

pub const LINK_STATE: Tag = Tag {
    key: "link_state",
    metric: "plcsim_link_state",
    unit: "",
};
