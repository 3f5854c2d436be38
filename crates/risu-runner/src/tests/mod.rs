//! Behavioural tests driving the module against scripted RISU stand-ins.
