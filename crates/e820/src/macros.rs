macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err.into());
        }
    };
}

macro_rules! bail {
    ($err:expr $(,)?) => {{
        return Err($err.into());
    }};
}
