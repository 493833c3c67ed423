mod test_step_accept_and_reject;
